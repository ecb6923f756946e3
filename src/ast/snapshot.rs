//! Structural tree serialization
//!
//! A [`NodeSnapshot`] is a normalized, renderer-independent view of a
//! node: tag, key attributes and children. It is what tooling and
//! snapshot tests compare, and it is built entirely through the
//! [`NodeRef`](super::visit::NodeRef) dispatch contract; nothing here
//! touches concrete node types beyond attribute extraction. Attribute
//! maps are ordered so serialized output is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::block::{Block, CellAlign};
use super::document::Document;
use super::span::Span;
use super::visit::NodeRef;

/// A serializable snapshot of one node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Capture a node and its subtree.
    pub fn capture(node: NodeRef<'_>) -> Self {
        let mut snapshot = NodeSnapshot::new(node.tag());
        snapshot.attributes = attributes_of(node);
        snapshot.children = node.children().into_iter().map(Self::capture).collect();
        snapshot
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Document {
    /// The structural serialization of the whole tree.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot::capture(NodeRef::Document(self))
    }
}

fn attributes_of(node: NodeRef<'_>) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    attrs.insert("lines".to_string(), node.position().to_string());
    match node {
        NodeRef::Document(doc) => {
            if doc.front_matter.is_some() {
                attrs.insert("front_matter".to_string(), "true".to_string());
            }
        }
        NodeRef::Block(block) => match block {
            Block::Heading(h) => {
                attrs.insert("level".to_string(), h.level.to_string());
                if h.setext {
                    attrs.insert("setext".to_string(), "true".to_string());
                }
            }
            Block::CodeFence(f) => {
                if !f.language.is_empty() {
                    attrs.insert("language".to_string(), f.language.clone());
                }
                attrs.insert("literal".to_string(), f.literal.clone());
            }
            Block::BlockCode(c) => {
                attrs.insert("literal".to_string(), c.literal.clone());
            }
            Block::List(l) => {
                attrs.insert("loose".to_string(), l.loose.to_string());
                if let Some(start) = l.start_at {
                    attrs.insert("start".to_string(), start.to_string());
                }
            }
            Block::HtmlBlock(h) => {
                attrs.insert("content".to_string(), h.content.clone());
            }
            Block::Table(t) => {
                let aligns: Vec<&str> = t
                    .column_align
                    .iter()
                    .map(|align| match align {
                        CellAlign::Left => "left",
                        CellAlign::Center => "center",
                        CellAlign::Right => "right",
                    })
                    .collect();
                attrs.insert("align".to_string(), aligns.join(","));
            }
            Block::Custom(c) => {
                for (key, value) in &c.data {
                    attrs.insert(key.clone(), value.clone());
                }
            }
            _ => {}
        },
        NodeRef::ListItem(item) => {
            attrs.insert("leader".to_string(), item.leader.clone());
        }
        NodeRef::FootnoteDef(def) => {
            attrs.insert("label".to_string(), def.label.clone());
        }
        NodeRef::Span(span) => match span {
            Span::RawText(t) => {
                attrs.insert("content".to_string(), t.content.clone());
            }
            Span::InlineCode(c) => {
                attrs.insert("content".to_string(), c.content.clone());
            }
            Span::Escape(e) => {
                attrs.insert("content".to_string(), e.content.clone());
            }
            Span::Math(m) => {
                attrs.insert("content".to_string(), m.content.clone());
            }
            Span::HtmlSpan(h) => {
                attrs.insert("content".to_string(), h.content.clone());
            }
            Span::AutoLink(a) => {
                attrs.insert("target".to_string(), a.target.clone());
            }
            Span::LineBreak(b) => {
                attrs.insert("soft".to_string(), b.soft.to_string());
            }
            Span::Link(l) => {
                attrs.insert("target".to_string(), l.target.clone());
                if !l.title.is_empty() {
                    attrs.insert("title".to_string(), l.title.clone());
                }
            }
            Span::Image(i) => {
                attrs.insert("src".to_string(), i.src.clone());
                if !i.title.is_empty() {
                    attrs.insert("title".to_string(), i.title.clone());
                }
            }
            Span::FootnoteRef(f) => {
                attrs.insert("label".to_string(), f.label.clone());
                attrs.insert("index".to_string(), f.index.to_string());
            }
            Span::Custom(c) => {
                if !c.content.is_empty() {
                    attrs.insert("content".to_string(), c.content.clone());
                }
            }
            _ => {}
        },
        _ => {}
    }
    attrs
}
