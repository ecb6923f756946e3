//! Span-level tokenization
//!
//! Span expansion is the second parse pass: it runs only after the block
//! tree and the reference tables are complete, so forward references
//! resolve in a single block-then-span sweep. [`tokenizer`] holds the
//! precedence sweep engine, [`emphasis`] and [`links`] the delimiter and
//! bracket machinery, and [`core`] / [`ext`] the built-in variants.

pub mod core;
pub mod emphasis;
pub mod ext;
pub mod links;
pub mod tokenizer;
