//! The token registry: variant capability records and token sets
//!
//! A variant is registered data, not a subclass: a small record holding a
//! cheap fast-test, a full recognizer, a priority, and the flags the
//! engines consult. The two built-in sets mirror strict CommonMark
//! ("core") and the common extensions ("extended"); custom sets are
//! assembled through [`TokenSetBuilder`], which surfaces registration
//! conflicts before any parse begins.

use std::fmt;

use regex::Regex;

use crate::ast::block::Block;
use crate::ast::span::Span;
use crate::blocks;
use crate::blocks::cursor::SourceCursor;
use crate::spans;

// ============================================================================
// Block variants
// ============================================================================

/// What a successful block recognizer produced.
#[derive(Debug)]
pub enum BlockOutcome {
    /// A visible node for the tree.
    Node(Block),
    /// Lines were consumed into the session tables (definitions) and
    /// leave no visible node behind.
    Consumed,
}

/// Cheap per-line fast test.
pub type BlockStartFn = fn(&str) -> bool;

/// Full recognizer. Returning `None` declines and must leave the cursor
/// untouched; returning `Some` must have consumed at least one line.
pub type BlockReadFn = fn(&mut SourceCursor) -> Option<BlockOutcome>;

/// Capability record for one block-level variant.
#[derive(Clone)]
pub struct BlockRule {
    pub name: &'static str,
    /// Lower priorities are tried first at each cursor position.
    pub priority: i32,
    pub start: BlockStartFn,
    pub read: BlockReadFn,
    /// Whether a line starting this variant may interrupt an open
    /// paragraph.
    pub interrupts_paragraph: bool,
    /// Optional refinement of `start` for the interruption check, for
    /// variants where only a subset of start lines interrupt (lists,
    /// HTML blocks).
    pub interrupt_test: Option<BlockStartFn>,
}

impl BlockRule {
    /// Whether `line` interrupts an open paragraph under this variant.
    pub fn interrupts(&self, line: &str) -> bool {
        if !self.interrupts_paragraph {
            return false;
        }
        (self.interrupt_test.unwrap_or(self.start))(line)
    }
}

impl fmt::Debug for BlockRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("interrupts_paragraph", &self.interrupts_paragraph)
            .finish()
    }
}

// ============================================================================
// Span variants
// ============================================================================

/// A claim returned by a scan matcher: the span plus the byte offset one
/// past the claimed text.
#[derive(Debug)]
pub struct ScanClaim {
    pub end: usize,
    pub span: Span,
}

/// Recognizer anchored at a byte position; used for constructs the regex
/// engine cannot express (code spans need equal-length closer runs).
pub type SpanScanFn = fn(text: &str, pos: usize) -> Option<ScanClaim>;

/// Node constructor for a pattern match. Returning `None` declines the
/// claim (e.g. a footnote reference with no matching definition) and the
/// next variant in precedence order is tried.
pub type SpanBuildFn = fn(&regex::Captures<'_>) -> Option<Span>;

/// How a span variant matches at a cursor position.
#[derive(Clone)]
pub enum SpanMatcher {
    /// Regex pattern plus node constructor.
    Pattern { regex: Regex, build: SpanBuildFn },
    /// Hand recognizer, consulted only at positions holding `trigger`.
    Scan { trigger: u8, scan: SpanScanFn },
    /// The delimiter-stack and bracket machinery (emphasis, strong,
    /// links, images). Activated as a registry entry like any other
    /// variant so dialects without it are expressible.
    Core,
}

/// Capability record for one span-level variant.
#[derive(Clone)]
pub struct SpanRule {
    pub name: &'static str,
    /// Lower precedences are tried first at each position; equal
    /// precedence resolves by declaration order.
    pub precedence: i32,
    /// Whether the claimed interior is re-scanned as a fresh sub-scan.
    /// Variants keeping literal interiors (code spans, autolinks, raw
    /// HTML) leave this false.
    pub parse_inner: bool,
    /// For pattern variants with `parse_inner`: the match group fed to
    /// the inner sub-scan.
    pub inner_group: usize,
    pub matcher: SpanMatcher,
}

impl fmt::Debug for SpanRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanRule")
            .field("name", &self.name)
            .field("precedence", &self.precedence)
            .field("parse_inner", &self.parse_inner)
            .finish()
    }
}

// ============================================================================
// Token sets
// ============================================================================

/// Errors surfaced while assembling a token set. Registration conflicts
/// are configuration errors and are reported here, at session creation,
/// never mid-parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateBlockVariant(String),
    DuplicateSpanVariant(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateBlockVariant(name) => {
                write!(f, "block variant '{}' is registered twice", name)
            }
            RegistryError::DuplicateSpanVariant(name) => {
                write!(f, "span variant '{}' is registered twice", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// An ordered, validated set of block and span variants.
#[derive(Debug, Clone)]
pub struct TokenSet {
    block_rules: Vec<BlockRule>,
    span_rules: Vec<SpanRule>,
    front_matter: bool,
}

impl TokenSet {
    /// Strict CommonMark.
    pub fn core() -> Self {
        Self {
            block_rules: vec![
                blocks::core::html_block_rule(),
                blocks::core::block_code_rule(),
                blocks::core::heading_rule(),
                blocks::core::quote_rule(),
                blocks::core::code_fence_rule(),
                blocks::core::thematic_break_rule(),
                blocks::core::list_rule(),
                blocks::core::link_definition_rule(),
            ],
            span_rules: vec![
                spans::core::escape_rule(),
                spans::core::html_span_rule(),
                spans::core::autolink_rule(),
                spans::core::core_rule(),
                spans::core::inline_code_rule(),
                spans::core::line_break_rule(),
            ],
            front_matter: false,
        }
    }

    /// CommonMark plus tables, footnotes, strikethrough, math and front
    /// matter.
    pub fn extended() -> Self {
        let mut set = Self::core();
        set.block_rules.push(blocks::ext::table_rule());
        set.block_rules.push(blocks::ext::footnote_rule());
        set.span_rules.push(spans::ext::footnote_ref_rule());
        set.span_rules.push(spans::ext::strikethrough_rule());
        set.span_rules.push(spans::ext::math_rule());
        set.front_matter = true;
        set.sort();
        set
    }

    /// Start an empty builder.
    pub fn builder() -> TokenSetBuilder {
        TokenSetBuilder {
            block_rules: Vec::new(),
            span_rules: Vec::new(),
            front_matter: false,
        }
    }

    /// Turn this set back into a builder, e.g. to add custom variants on
    /// top of the core set.
    pub fn into_builder(self) -> TokenSetBuilder {
        TokenSetBuilder {
            block_rules: self.block_rules,
            span_rules: self.span_rules,
            front_matter: self.front_matter,
        }
    }

    pub fn block_rules(&self) -> &[BlockRule] {
        &self.block_rules
    }

    pub fn span_rules(&self) -> &[SpanRule] {
        &self.span_rules
    }

    /// Whether a leading `---` fence is captured as front matter.
    pub fn front_matter(&self) -> bool {
        self.front_matter
    }

    fn sort(&mut self) {
        // Stable sorts keep declaration order as the tie-break.
        self.block_rules.sort_by_key(|rule| rule.priority);
        self.span_rules.sort_by_key(|rule| rule.precedence);
    }
}

/// Assembles a [`TokenSet`], validating it on `build`.
#[derive(Debug, Clone)]
pub struct TokenSetBuilder {
    block_rules: Vec<BlockRule>,
    span_rules: Vec<SpanRule>,
    front_matter: bool,
}

impl TokenSetBuilder {
    pub fn block(mut self, rule: BlockRule) -> Self {
        self.block_rules.push(rule);
        self
    }

    pub fn span(mut self, rule: SpanRule) -> Self {
        self.span_rules.push(rule);
        self
    }

    pub fn front_matter(mut self, enabled: bool) -> Self {
        self.front_matter = enabled;
        self
    }

    pub fn build(self) -> Result<TokenSet, RegistryError> {
        for (i, rule) in self.block_rules.iter().enumerate() {
            if self.block_rules[..i].iter().any(|r| r.name == rule.name) {
                return Err(RegistryError::DuplicateBlockVariant(rule.name.to_string()));
            }
        }
        for (i, rule) in self.span_rules.iter().enumerate() {
            if self.span_rules[..i].iter().any(|r| r.name == rule.name) {
                return Err(RegistryError::DuplicateSpanVariant(rule.name.to_string()));
            }
        }
        let mut set = TokenSet {
            block_rules: self.block_rules,
            span_rules: self.span_rules,
            front_matter: self.front_matter,
        };
        set.sort();
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_set_orders_by_priority() {
        let set = TokenSet::core();
        let priorities: Vec<i32> = set.block_rules().iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert!(set.block_rules().iter().any(|r| r.name == "heading"));
        assert!(!set.front_matter());
    }

    #[test]
    fn test_extended_set_adds_variants() {
        let set = TokenSet::extended();
        assert!(set.block_rules().iter().any(|r| r.name == "table"));
        assert!(set.span_rules().iter().any(|r| r.name == "strikethrough"));
        assert!(set.front_matter());
    }

    #[test]
    fn test_duplicate_variant_is_a_configuration_error() {
        let result = TokenSet::core()
            .into_builder()
            .block(blocks::core::heading_rule())
            .build();
        assert_eq!(
            result.err(),
            Some(RegistryError::DuplicateBlockVariant("heading".to_string()))
        );
    }
}
