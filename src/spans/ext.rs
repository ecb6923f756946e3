//! Extended span-level variants: strikethrough, math, footnote references

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::position::Position;
use crate::ast::span::{FootnoteRef, Math, Span, Strikethrough};
use crate::session;
use crate::session::registry::{SpanMatcher, SpanRule};

static STRIKETHROUGH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)~~(.+?)~~").expect("strikethrough pattern is valid"));

// Two alternatives instead of a backreference: double-dollar first so
// `$$x$$` is not claimed as an empty single-dollar form.
static MATH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$([^$]+?)\$\$|\$([^$]+?)\$").expect("math pattern is valid"));

static FOOTNOTE_REF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\^([a-zA-Z0-9#@]+)\]").expect("footnote ref pattern is valid"));

pub fn strikethrough_rule() -> SpanRule {
    SpanRule {
        name: "strikethrough",
        precedence: 35,
        parse_inner: true,
        inner_group: 1,
        matcher: SpanMatcher::Pattern {
            regex: STRIKETHROUGH_PATTERN.clone(),
            build: |_caps| {
                Some(Span::Strikethrough(Strikethrough {
                    children: Vec::new(),
                    position: Position::default(),
                }))
            },
        },
    }
}

pub fn math_rule() -> SpanRule {
    SpanRule {
        name: "math",
        precedence: 36,
        parse_inner: false,
        inner_group: 0,
        matcher: SpanMatcher::Pattern {
            regex: MATH_PATTERN.clone(),
            build: |caps| {
                // Content keeps its delimiters so renderers can tell the
                // display form from the inline form.
                Some(Span::Math(Math {
                    content: caps[0].to_string(),
                    position: Position::default(),
                }))
            },
        },
    }
}

/// Footnote references resolve against the session's footnote table and
/// fix reference-order numbering at first sighting. Unknown labels
/// decline, degrading to literal text.
///
/// Registered before the core bracket machinery: in a left-to-right scan
/// the bracket stack would otherwise claim the `[` first.
pub fn footnote_ref_rule() -> SpanRule {
    SpanRule {
        name: "footnote_ref",
        precedence: 28,
        parse_inner: false,
        inner_group: 0,
        matcher: SpanMatcher::Pattern {
            regex: FOOTNOTE_REF_PATTERN.clone(),
            build: |caps| {
                let label = caps[1].to_string();
                let index = session::with_active(|s| s.footnote_index(&label))?;
                Some(Span::FootnoteRef(FootnoteRef {
                    label,
                    index,
                    position: Position::default(),
                }))
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_pattern_forms() {
        let caps = MATH_PATTERN.captures("$$a+b$$").expect("matches");
        assert_eq!(&caps[0], "$$a+b$$");
        assert_eq!(caps.get(1).map(|m| m.as_str()), Some("a+b"));

        let caps = MATH_PATTERN.captures("$a$").expect("matches");
        assert_eq!(caps.get(2).map(|m| m.as_str()), Some("a"));

        assert!(MATH_PATTERN.captures("$$").is_none());
    }

    #[test]
    fn test_strikethrough_is_non_greedy() {
        let caps = STRIKETHROUGH_PATTERN.captures("~~a~~ and ~~b~~").expect("matches");
        assert_eq!(caps.get(1).map(|m| m.as_str()), Some("a"));
    }
}
