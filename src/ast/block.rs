//! Block-level node definitions
//!
//! Block nodes are the structural units spanning whole source lines.
//! Container variants (quote, list item) own nested block children;
//! boundary variants (paragraph, heading, table cell) own an
//! [`InlineContent`] that starts life as a span container and is expanded
//! by the span pass.

use std::collections::BTreeMap;
use std::fmt;

use super::position::Position;
use super::span::InlineContent;

/// A block-level node.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Heading(Heading),
    Quote(Quote),
    CodeFence(CodeFence),
    BlockCode(BlockCode),
    ThematicBreak(ThematicBreak),
    List(List),
    HtmlBlock(HtmlBlock),
    Table(Table),
    Custom(CustomBlock),
}

/// A paragraph of continuous text lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub content: InlineContent,
    pub position: Position,
}

/// An ATX ("## heading") or setext ("heading\n===") heading.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub level: u8,
    /// True when the heading was written with a setext underline.
    pub setext: bool,
    pub content: InlineContent,
    pub position: Position,
}

/// A block quote; children are a full nested block parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub children: Vec<Block>,
    pub position: Position,
}

/// A fenced code block. The interior is literal.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeFence {
    /// First word of the info string, with escapes resolved.
    pub language: String,
    /// The rest of the info string after the language.
    pub arguments: String,
    pub literal: String,
    pub position: Position,
}

/// An indented code block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockCode {
    pub literal: String,
    pub position: Position,
}

/// A thematic break (horizontal rule).
#[derive(Debug, Clone, PartialEq)]
pub struct ThematicBreak {
    pub position: Position,
}

/// An ordered or unordered list.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub items: Vec<ListItem>,
    /// Whether items are separated by blank lines. Classified only after
    /// every item has been read.
    pub loose: bool,
    /// None for unordered lists, the starting number for ordered ones.
    pub start_at: Option<u64>,
    pub position: Position,
}

/// A single list item; children are a full nested block parse of the
/// item's stripped line range.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub children: Vec<Block>,
    pub loose: bool,
    /// The marker as written, e.g. "-" or "3.".
    pub leader: String,
    pub position: Position,
}

/// A block of raw HTML, kept literal and unvalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlBlock {
    pub content: String,
    pub position: Position,
}

/// Column alignment of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A table with a header row confirmed by a delimiter row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Option<TableRow>,
    pub rows: Vec<TableRow>,
    pub column_align: Vec<CellAlign>,
    pub position: Position,
}

/// A table row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    pub position: Position,
}

/// A table cell; a boundary between block and span level.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub content: InlineContent,
    pub align: CellAlign,
    pub position: Position,
}

/// A block produced by a registered custom variant.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomBlock {
    pub name: String,
    pub data: BTreeMap<String, String>,
    pub children: Vec<Block>,
    pub content: Option<InlineContent>,
    pub position: Position,
}

impl Block {
    /// The dispatch tag of this node.
    pub fn tag(&self) -> &str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Heading(_) => "heading",
            Block::Quote(_) => "quote",
            Block::CodeFence(_) => "code_fence",
            Block::BlockCode(_) => "block_code",
            Block::ThematicBreak(_) => "thematic_break",
            Block::List(_) => "list",
            Block::HtmlBlock(_) => "html_block",
            Block::Table(_) => "table",
            Block::Custom(c) => &c.name,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Block::Paragraph(n) => n.position,
            Block::Heading(n) => n.position,
            Block::Quote(n) => n.position,
            Block::CodeFence(n) => n.position,
            Block::BlockCode(n) => n.position,
            Block::ThematicBreak(n) => n.position,
            Block::List(n) => n.position,
            Block::HtmlBlock(n) => n.position,
            Block::Table(n) => n.position,
            Block::Custom(n) => n.position,
        }
    }

    /// Nested block children, for container variants.
    pub fn children(&self) -> Option<&[Block]> {
        match self {
            Block::Quote(n) => Some(&n.children),
            Block::Custom(n) => Some(&n.children),
            _ => None,
        }
    }

    /// The inline content, for boundary variants.
    pub fn inline_content(&self) -> Option<&InlineContent> {
        match self {
            Block::Paragraph(n) => Some(&n.content),
            Block::Heading(n) => Some(&n.content),
            Block::Custom(n) => n.content.as_ref(),
            _ => None,
        }
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Block::List(_))
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        if let Block::Paragraph(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_heading(&self) -> Option<&Heading> {
        if let Block::Heading(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_quote(&self) -> Option<&Quote> {
        if let Block::Quote(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        if let Block::List(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_code_fence(&self) -> Option<&CodeFence> {
        if let Block::CodeFence(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        if let Block::Table(n) = self {
            Some(n)
        } else {
            None
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Heading(h) => write!(f, "heading(level {})", h.level),
            Block::List(l) => write!(f, "list({} items)", l.items.len()),
            Block::Quote(q) => write!(f, "quote({} children)", q.children.len()),
            Block::Table(t) => write!(f, "table({} rows)", t.rows.len()),
            other => write!(f, "{}", other.tag()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags() {
        let node = Block::ThematicBreak(ThematicBreak {
            position: Position::single(1),
        });
        assert_eq!(node.tag(), "thematic_break");

        let custom = Block::Custom(CustomBlock {
            name: "admonition".to_string(),
            data: BTreeMap::new(),
            children: Vec::new(),
            content: None,
            position: Position::single(1),
        });
        assert_eq!(custom.tag(), "admonition");
    }

    #[test]
    fn test_inline_content_access() {
        let para = Block::Paragraph(Paragraph {
            content: InlineContent::pending("text", 1),
            position: Position::single(1),
        });
        assert!(para.inline_content().is_some());
        assert!(para.children().is_none());
    }
}
