//! Span-level (inline) node definitions
//!
//! Span nodes live inside the text of boundary blocks (paragraphs,
//! headings, table cells, footnote bodies). During the block pass that
//! text is parked in a [`SpanContainer`]; the span pass replaces every
//! container with its expansion, so a finished tree holds only
//! [`InlineContent::Expanded`] values.

use std::fmt;

use super::position::Position;

/// A span-level node.
#[derive(Debug, Clone, PartialEq)]
pub enum Span {
    RawText(RawText),
    Emphasis(Emphasis),
    Strong(Strong),
    InlineCode(InlineCode),
    Escape(Escape),
    AutoLink(AutoLink),
    HtmlSpan(HtmlSpan),
    LineBreak(LineBreak),
    Link(Link),
    Image(Image),
    Strikethrough(Strikethrough),
    Math(Math),
    FootnoteRef(FootnoteRef),
    Custom(CustomSpan),
}

/// Literal text. All recursion bottoms out here.
#[derive(Debug, Clone, PartialEq)]
pub struct RawText {
    pub content: String,
    pub position: Position,
}

/// Emphasis ("*some text*").
#[derive(Debug, Clone, PartialEq)]
pub struct Emphasis {
    pub children: Vec<Span>,
    pub position: Position,
}

/// Strong emphasis ("**some text**").
#[derive(Debug, Clone, PartialEq)]
pub struct Strong {
    pub children: Vec<Span>,
    pub position: Position,
}

/// An inline code span ("`some code`"). The interior is kept literal,
/// with runs of spaces and newlines collapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineCode {
    pub content: String,
    pub position: Position,
}

/// A backslash escape ("\\*"); `content` is the escaped character.
#[derive(Debug, Clone, PartialEq)]
pub struct Escape {
    pub content: String,
    pub position: Position,
}

/// An autolink ("<http://example.com>").
#[derive(Debug, Clone, PartialEq)]
pub struct AutoLink {
    /// Link target, identical to the literal content between the brackets.
    pub target: String,
    /// Whether the target is an email address without an explicit scheme.
    pub mailto: bool,
    pub position: Position,
}

/// A raw inline HTML tag, kept literal and unvalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlSpan {
    pub content: String,
    pub position: Position,
}

/// A hard or soft line break.
#[derive(Debug, Clone, PartialEq)]
pub struct LineBreak {
    pub soft: bool,
    pub position: Position,
}

/// A link, either inline ("[name](target)") or resolved from a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub target: String,
    pub title: String,
    pub children: Vec<Span>,
    pub position: Position,
}

/// An image ("![alt](src \"title\")").
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub src: String,
    pub title: String,
    pub children: Vec<Span>,
    pub position: Position,
}

/// Strikethrough ("~~some text~~").
#[derive(Debug, Clone, PartialEq)]
pub struct Strikethrough {
    pub children: Vec<Span>,
    pub position: Position,
}

/// Dollar math, single or double ("$a=1$"). The content keeps its
/// delimiters so renderers can distinguish the two forms.
#[derive(Debug, Clone, PartialEq)]
pub struct Math {
    pub content: String,
    pub position: Position,
}

/// A footnote reference ("[^label]"). `index` is the 1-based reference
/// order, fixed at the first sighting during span expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteRef {
    pub label: String,
    pub index: usize,
    pub position: Position,
}

/// A span produced by a registered custom variant.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomSpan {
    pub name: String,
    pub content: String,
    pub children: Vec<Span>,
    pub position: Position,
}

impl Span {
    /// The dispatch tag of this node.
    pub fn tag(&self) -> &str {
        match self {
            Span::RawText(_) => "raw_text",
            Span::Emphasis(_) => "emphasis",
            Span::Strong(_) => "strong",
            Span::InlineCode(_) => "inline_code",
            Span::Escape(_) => "escape",
            Span::AutoLink(_) => "auto_link",
            Span::HtmlSpan(_) => "html_span",
            Span::LineBreak(_) => "line_break",
            Span::Link(_) => "link",
            Span::Image(_) => "image",
            Span::Strikethrough(_) => "strikethrough",
            Span::Math(_) => "math",
            Span::FootnoteRef(_) => "footnote_ref",
            Span::Custom(c) => &c.name,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Span::RawText(n) => n.position,
            Span::Emphasis(n) => n.position,
            Span::Strong(n) => n.position,
            Span::InlineCode(n) => n.position,
            Span::Escape(n) => n.position,
            Span::AutoLink(n) => n.position,
            Span::HtmlSpan(n) => n.position,
            Span::LineBreak(n) => n.position,
            Span::Link(n) => n.position,
            Span::Image(n) => n.position,
            Span::Strikethrough(n) => n.position,
            Span::Math(n) => n.position,
            Span::FootnoteRef(n) => n.position,
            Span::Custom(n) => n.position,
        }
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        match self {
            Span::RawText(n) => n.position = position,
            Span::Emphasis(n) => n.position = position,
            Span::Strong(n) => n.position = position,
            Span::InlineCode(n) => n.position = position,
            Span::Escape(n) => n.position = position,
            Span::AutoLink(n) => n.position = position,
            Span::HtmlSpan(n) => n.position = position,
            Span::LineBreak(n) => n.position = position,
            Span::Link(n) => n.position = position,
            Span::Image(n) => n.position = position,
            Span::Strikethrough(n) => n.position = position,
            Span::Math(n) => n.position = position,
            Span::FootnoteRef(n) => n.position = position,
            Span::Custom(n) => n.position = position,
        }
    }

    /// Child spans, for the node kinds that parse inner content.
    pub fn children(&self) -> Option<&[Span]> {
        match self {
            Span::Emphasis(n) => Some(&n.children),
            Span::Strong(n) => Some(&n.children),
            Span::Link(n) => Some(&n.children),
            Span::Image(n) => Some(&n.children),
            Span::Strikethrough(n) => Some(&n.children),
            Span::Custom(n) => Some(&n.children),
            _ => None,
        }
    }

    /// Attach children to a node that parses inner content. Returns false
    /// for leaf kinds, which keep their interiors literal.
    pub(crate) fn set_children(&mut self, children: Vec<Span>) -> bool {
        match self {
            Span::Emphasis(n) => n.children = children,
            Span::Strong(n) => n.children = children,
            Span::Link(n) => n.children = children,
            Span::Image(n) => n.children = children,
            Span::Strikethrough(n) => n.children = children,
            Span::Custom(n) => n.children = children,
            _ => return false,
        }
        true
    }

    pub fn as_raw_text(&self) -> Option<&RawText> {
        if let Span::RawText(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_link(&self) -> Option<&Link> {
        if let Span::Link(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_inline_code(&self) -> Option<&InlineCode> {
        if let Span::InlineCode(n) = self {
            Some(n)
        } else {
            None
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.children() {
            Some(children) => write!(f, "{}({} children)", self.tag(), children.len()),
            None => write!(f, "{}", self.tag()),
        }
    }
}

/// Transient holder for unexpanded inline text.
///
/// A container records the raw text of a boundary block together with the
/// source line its first character sits on, so expanded spans can derive
/// their own positions from byte offsets. Containers only exist between
/// the block pass and the span pass; they never appear in a finished tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanContainer {
    pub text: String,
    pub start_line: usize,
}

impl SpanContainer {
    pub fn new(text: impl Into<String>, start_line: usize) -> Self {
        Self {
            text: text.into(),
            start_line,
        }
    }
}

/// Inline content of a boundary block: raw until the span pass, expanded
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineContent {
    Pending(SpanContainer),
    Expanded(Vec<Span>),
}

impl InlineContent {
    pub fn pending(text: impl Into<String>, start_line: usize) -> Self {
        InlineContent::Pending(SpanContainer::new(text, start_line))
    }

    pub fn expanded(spans: Vec<Span>) -> Self {
        InlineContent::Expanded(spans)
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, InlineContent::Expanded(_))
    }

    /// The expanded spans; empty while still pending.
    pub fn spans(&self) -> &[Span] {
        match self {
            InlineContent::Pending(_) => &[],
            InlineContent::Expanded(spans) => spans,
        }
    }

    /// The raw container text; empty once expanded.
    pub fn raw_text(&self) -> &str {
        match self {
            InlineContent::Pending(container) => &container.text,
            InlineContent::Expanded(_) => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_content_states() {
        let pending = InlineContent::pending("some *text*", 3);
        assert!(!pending.is_expanded());
        assert_eq!(pending.raw_text(), "some *text*");
        assert!(pending.spans().is_empty());

        let expanded = InlineContent::expanded(vec![Span::RawText(RawText {
            content: "some".to_string(),
            position: Position::single(3),
        })]);
        assert!(expanded.is_expanded());
        assert_eq!(expanded.spans().len(), 1);
        assert_eq!(expanded.raw_text(), "");
    }

    #[test]
    fn test_set_children_rejects_literal_interiors() {
        let mut code = Span::InlineCode(InlineCode {
            content: "x".to_string(),
            position: Position::single(1),
        });
        assert!(!code.set_children(Vec::new()));

        let mut emphasis = Span::Emphasis(Emphasis {
            children: Vec::new(),
            position: Position::single(1),
        });
        assert!(emphasis.set_children(vec![Span::RawText(RawText {
            content: "x".to_string(),
            position: Position::single(1),
        })]));
        assert_eq!(emphasis.children().map(<[Span]>::len), Some(1));
    }
}
