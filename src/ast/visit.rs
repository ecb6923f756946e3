//! Generic dispatch-by-tag traversal
//!
//! External consumers (renderers, linters, tooling) never need to know
//! the concrete node types: [`NodeRef`] exposes the tag, position and
//! children of any node, and [`walk`] drives a [`Visit`] implementation
//! over a document in preorder. The finished tree only ever contains
//! node variants that were active in the parse session.

use super::block::{Block, ListItem, TableCell, TableRow};
use super::document::{Document, FootnoteDef};
use super::position::Position;
use super::span::{InlineContent, Span};

/// A borrowed reference to any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Document(&'a Document),
    Block(&'a Block),
    ListItem(&'a ListItem),
    TableRow(&'a TableRow),
    TableCell(&'a TableCell),
    FootnoteDef(&'a FootnoteDef),
    Span(&'a Span),
}

impl<'a> NodeRef<'a> {
    /// The dispatch tag.
    pub fn tag(&self) -> &'a str {
        match self {
            NodeRef::Document(_) => "document",
            NodeRef::Block(block) => block.tag(),
            NodeRef::ListItem(_) => "list_item",
            NodeRef::TableRow(_) => "table_row",
            NodeRef::TableCell(_) => "table_cell",
            NodeRef::FootnoteDef(_) => "footnote_def",
            NodeRef::Span(span) => span.tag(),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            NodeRef::Document(doc) => doc.position(),
            NodeRef::Block(block) => block.position(),
            NodeRef::ListItem(item) => item.position,
            NodeRef::TableRow(row) => row.position,
            NodeRef::TableCell(cell) => cell.position,
            NodeRef::FootnoteDef(def) => def.position,
            NodeRef::Span(span) => span.position(),
        }
    }

    /// Child nodes in document order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match self {
            NodeRef::Document(doc) => {
                let mut children: Vec<NodeRef<'a>> =
                    doc.children.iter().map(NodeRef::Block).collect();
                children.extend(doc.footnotes.iter().map(NodeRef::FootnoteDef));
                children
            }
            NodeRef::Block(block) => match block {
                Block::Paragraph(p) => inline_children(&p.content),
                Block::Heading(h) => inline_children(&h.content),
                Block::Quote(q) => q.children.iter().map(NodeRef::Block).collect(),
                Block::List(l) => l.items.iter().map(NodeRef::ListItem).collect(),
                Block::Table(t) => {
                    let mut children: Vec<NodeRef<'a>> =
                        t.header.iter().map(NodeRef::TableRow).collect();
                    children.extend(t.rows.iter().map(NodeRef::TableRow));
                    children
                }
                Block::Custom(c) => {
                    let mut children = c
                        .content
                        .as_ref()
                        .map(inline_children)
                        .unwrap_or_default();
                    children.extend(c.children.iter().map(NodeRef::Block));
                    children
                }
                Block::CodeFence(_)
                | Block::BlockCode(_)
                | Block::ThematicBreak(_)
                | Block::HtmlBlock(_) => Vec::new(),
            },
            NodeRef::ListItem(item) => item.children.iter().map(NodeRef::Block).collect(),
            NodeRef::TableRow(row) => row.cells.iter().map(NodeRef::TableCell).collect(),
            NodeRef::TableCell(cell) => inline_children(&cell.content),
            NodeRef::FootnoteDef(def) => inline_children(&def.content),
            NodeRef::Span(span) => span
                .children()
                .map(|children| children.iter().map(NodeRef::Span).collect())
                .unwrap_or_default(),
        }
    }
}

fn inline_children(content: &InlineContent) -> Vec<NodeRef<'_>> {
    content.spans().iter().map(NodeRef::Span).collect()
}

/// Preorder visitor over the tree.
pub trait Visit {
    fn node(&mut self, node: NodeRef<'_>, depth: usize);
}

/// Walk `document` in preorder, calling the visitor for every node,
/// starting with the document itself at depth zero.
pub fn walk(document: &Document, visitor: &mut dyn Visit) {
    walk_node(NodeRef::Document(document), visitor, 0);
}

fn walk_node(node: NodeRef<'_>, visitor: &mut dyn Visit, depth: usize) {
    visitor.node(node, depth);
    for child in node.children() {
        walk_node(child, visitor, depth + 1);
    }
}
