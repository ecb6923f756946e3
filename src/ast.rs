//! Syntax tree definitions and traversal
//!
//! The tree is a tagged union per level: [`block::Block`] for structural
//! units spanning whole lines, [`span::Span`] for inline units, with
//! [`document::Document`] as the root owning the resolved reference
//! tables. Consumers traverse either by direct child iteration or
//! through the generic [`visit`] dispatch contract; [`snapshot`]
//! provides the structural serialization built on top of it.

pub mod block;
pub mod document;
pub mod position;
pub mod snapshot;
pub mod span;
pub mod visit;
