//! The document root and the tables it owns
//!
//! After a parse completes, the session's reference tables move into the
//! [`Document`] so the finished tree is self-contained: link definitions,
//! footnote definitions with their first-reference ordering, and the raw
//! front matter payload when one was present.

use std::collections::HashMap;
use std::fmt;

use super::block::{Block, Paragraph};
use super::position::Position;
use super::span::InlineContent;

/// A resolved link definition: `[key]: target "title"`.
///
/// Keys are compared case-insensitively with interior whitespace
/// collapsed; the first definition for a key wins and later duplicates
/// are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDef {
    pub target: String,
    /// Empty when the definition carried no title.
    pub title: String,
}

/// A footnote definition: `[^label]: body`.
///
/// The body is a span boundary, expanded in the span pass like any other.
/// Reference-order numbering is assigned at the first *reference*
/// sighting, not at definition time.
#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteDef {
    pub label: String,
    pub content: InlineContent,
    pub position: Position,
}

/// An opaque front matter payload, captured verbatim from a leading
/// `---` fence. Interpreting the payload is the consumer's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub content: String,
    pub position: Position,
}

/// The root of a finished syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub children: Vec<Block>,
    /// Link definitions by normalized key.
    pub link_definitions: HashMap<String, LinkDef>,
    /// Footnote definitions in definition order.
    pub footnotes: Vec<FootnoteDef>,
    /// Footnote labels in first-reference order; index + 1 is the number
    /// carried by the matching references.
    pub footnote_order: Vec<String>,
    pub front_matter: Option<FrontMatter>,
}

impl Document {
    /// Iterate over the top-level blocks.
    pub fn iter_children(&self) -> impl Iterator<Item = &Block> {
        self.children.iter()
    }

    /// Iterate over top-level paragraphs only.
    pub fn iter_paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.children.iter().filter_map(|block| block.as_paragraph())
    }

    /// Look up a footnote definition by label.
    pub fn footnote(&self, label: &str) -> Option<&FootnoteDef> {
        self.footnotes.iter().find(|def| def.label == label)
    }

    /// The line range covered by the top-level children.
    pub fn position(&self) -> Position {
        let start = self
            .front_matter
            .as_ref()
            .map(|fm| fm.position.start_line)
            .or_else(|| self.children.first().map(|b| b.position().start_line))
            .unwrap_or(1);
        let end = self
            .children
            .last()
            .map(|b| b.position().end_line)
            .unwrap_or(start);
        Position::new(start, end)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "document({} blocks, {} link definitions, {} footnotes)",
            self.children.len(),
            self.link_definitions.len(),
            self.footnotes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::block::ThematicBreak;

    #[test]
    fn test_position_spans_children() {
        let doc = Document {
            children: vec![
                Block::ThematicBreak(ThematicBreak {
                    position: Position::single(2),
                }),
                Block::ThematicBreak(ThematicBreak {
                    position: Position::single(5),
                }),
            ],
            link_definitions: HashMap::new(),
            footnotes: Vec::new(),
            footnote_order: Vec::new(),
            front_matter: None,
        };
        assert_eq!(doc.position(), Position::new(2, 5));
    }

    #[test]
    fn test_footnote_lookup() {
        let doc = Document {
            children: Vec::new(),
            link_definitions: HashMap::new(),
            footnotes: vec![FootnoteDef {
                label: "a".to_string(),
                content: InlineContent::expanded(Vec::new()),
                position: Position::single(1),
            }],
            footnote_order: vec!["a".to_string()],
            front_matter: None,
        };
        assert!(doc.footnote("a").is_some());
        assert!(doc.footnote("b").is_none());
    }
}
