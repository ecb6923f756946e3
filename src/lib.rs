//! # marq
//!
//! An extensible tokenization engine for CommonMark Markdown.
//!
//! Parsing runs in two strictly sequential passes over one tree: the
//! block pass builds the structure and collects link and footnote
//! definitions, the span pass then expands the deferred inline text so
//! that references can resolve even when they precede their definitions
//! in source order. The token set is runtime data, not code: variants
//! are registered capability records, and custom sets are assembled with
//! [`TokenSet::builder`].
//!
//! A parse is a pure, total, terminating function of the input and the
//! active token set. Malformed constructs degrade to lower-priority
//! variants or literal text; nothing aborts. All mutable state lives in
//! a per-parse [`ParseSession`] bound to the current thread for the
//! duration of the call, so independent parses on separate threads need
//! no synchronization.
//!
//! ```text
//! let doc = marq::parse("a [link][id]\n\n[id]: https://example.com\n");
//! println!("{}", doc.snapshot().to_json().unwrap());
//! ```

pub mod ast;
pub mod blocks;
pub mod session;
pub mod spans;

pub use ast::block::Block;
pub use ast::document::{Document, FootnoteDef, FrontMatter, LinkDef};
pub use ast::position::Position;
pub use ast::snapshot::NodeSnapshot;
pub use ast::span::{InlineContent, Span, SpanContainer};
pub use ast::visit::{walk, NodeRef, Visit};
pub use session::registry::{
    BlockOutcome, BlockRule, RegistryError, ScanClaim, SpanMatcher, SpanRule, TokenSet,
};
pub use session::{bind, ParseSession, SessionGuard};

/// Parse with the strict CommonMark token set.
pub fn parse(text: &str) -> Document {
    parse_with(text, TokenSet::core())
}

/// Parse with the extended token set: tables, footnotes, strikethrough,
/// math and front matter.
pub fn parse_extended(text: &str) -> Document {
    parse_with(text, TokenSet::extended())
}

/// Parse with an explicit token set. A fresh session is bound for the
/// duration of the call and unbound on every exit path, so differently
/// configured parses never observe each other's state.
pub fn parse_with(text: &str, tokens: TokenSet) -> Document {
    let capture_front_matter = tokens.front_matter();
    let guard = session::bind(ParseSession::new(tokens));

    let mut cursor = blocks::cursor::SourceCursor::new(text);
    let front_matter = if capture_front_matter {
        blocks::ext::read_front_matter(&mut cursor)
    } else {
        None
    };

    let buffer = blocks::tokenizer::tokenize_blocks(&mut cursor, true);
    let mut children = buffer.nodes;
    spans::tokenizer::expand_blocks(&mut children);

    // Footnote bodies are span boundaries too; expand them in definition
    // order while the session (and its tables) is still bound.
    let footnote_count = session::with_active(|s| s.footnote_count());
    for index in 0..footnote_count {
        if let Some(mut content) = session::with_active(|s| s.take_footnote_content(index)) {
            spans::tokenizer::expand_content(&mut content);
            session::with_active(|s| s.restore_footnote_content(index, content));
        }
    }

    let (link_definitions, footnotes, footnote_order) =
        session::with_active(|s| s.take_tables());
    drop(guard);

    Document {
        children,
        link_definitions,
        footnotes,
        footnote_order,
        front_matter,
    }
}
