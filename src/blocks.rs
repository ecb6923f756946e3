//! Block-level tokenization
//!
//! The [`cursor`] module provides the normalized line view, [`tokenizer`]
//! the priority-ordered recognizer loop and paragraph fallback, and
//! [`core`] / [`ext`] the built-in variant implementations registered by
//! the token sets.

pub mod core;
pub mod cursor;
pub mod ext;
pub mod tokenizer;
