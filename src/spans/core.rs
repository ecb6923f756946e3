//! Built-in span-level variants for the CommonMark core set
//!
//! Each variant is a [`SpanRule`] capability record. Escapes, raw HTML,
//! autolinks and line breaks are plain regex patterns; inline code needs
//! a hand recognizer because its closer run must match the opener's
//! length exactly, which a regex without backreferences cannot express.
//! The delimiter/bracket machinery registers through [`core_rule`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::position::Position;
use crate::ast::span::{AutoLink, Escape, HtmlSpan, InlineCode, LineBreak, Span};
use crate::session::registry::{ScanClaim, SpanMatcher, SpanRule};

static ESCAPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\([!-/:-@\[-`{-~])").expect("escape pattern is valid")
});

static AUTOLINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<([A-Za-z][A-Za-z0-9+.-]{1,31}:[^ <>]*|[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*)>",
    )
    .expect("autolink pattern is valid")
});

static HTML_SPAN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"<[A-Za-z][A-Za-z0-9-]*(?:\s+[A-Za-z_:][A-Za-z0-9_.:-]*(?:\s*=\s*(?:[^ "'=<>`]+|'[^']*'|"[^"]*"))?)*\s*/?>"#,
        r"|</[A-Za-z][A-Za-z0-9-]*\s*>",
        r"|<!--(?s:.*?)-->",
        r"|<\?(?s:.*?)\?>",
        r"|<![A-Z][^>]*>",
        r"|<!\[CDATA\[(?s:.*?)\]\]>",
    ))
    .expect("html span pattern is valid")
});

static LINE_BREAK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"( *|\\)\n").expect("line break pattern is valid"));

/// Remove backslashes in front of ASCII punctuation.
pub(crate) fn strip_escapes(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

pub fn escape_rule() -> SpanRule {
    SpanRule {
        name: "escape",
        precedence: 10,
        parse_inner: false,
        inner_group: 0,
        matcher: SpanMatcher::Pattern {
            regex: ESCAPE_PATTERN.clone(),
            build: |caps| {
                Some(Span::Escape(Escape {
                    content: caps[1].to_string(),
                    position: Position::default(),
                }))
            },
        },
    }
}

pub fn html_span_rule() -> SpanRule {
    SpanRule {
        name: "html_span",
        precedence: 20,
        parse_inner: false,
        inner_group: 0,
        matcher: SpanMatcher::Pattern {
            regex: HTML_SPAN_PATTERN.clone(),
            build: |caps| {
                Some(Span::HtmlSpan(HtmlSpan {
                    content: caps[0].to_string(),
                    position: Position::default(),
                }))
            },
        },
    }
}

pub fn autolink_rule() -> SpanRule {
    SpanRule {
        name: "auto_link",
        precedence: 25,
        parse_inner: false,
        inner_group: 0,
        matcher: SpanMatcher::Pattern {
            regex: AUTOLINK_PATTERN.clone(),
            build: |caps| {
                let target = caps[1].to_string();
                let mailto = target.contains('@') && !target.to_lowercase().contains("mailto");
                Some(Span::AutoLink(AutoLink {
                    target,
                    mailto,
                    position: Position::default(),
                }))
            },
        },
    }
}

/// The delimiter-stack and bracket machinery: emphasis, strong, links
/// and images. Tried at its precedence slot like any pattern variant.
pub fn core_rule() -> SpanRule {
    SpanRule {
        name: "core",
        precedence: 30,
        parse_inner: true,
        inner_group: 0,
        matcher: SpanMatcher::Core,
    }
}

pub fn inline_code_rule() -> SpanRule {
    SpanRule {
        name: "inline_code",
        precedence: 40,
        parse_inner: false,
        inner_group: 0,
        matcher: SpanMatcher::Scan {
            trigger: b'`',
            scan: scan_code_span,
        },
    }
}

pub fn line_break_rule() -> SpanRule {
    SpanRule {
        name: "line_break",
        precedence: 50,
        parse_inner: false,
        inner_group: 0,
        matcher: SpanMatcher::Pattern {
            regex: LINE_BREAK_PATTERN.clone(),
            build: |caps| {
                let lead = &caps[1];
                Some(Span::LineBreak(LineBreak {
                    soft: !(lead.starts_with("  ") || lead == "\\"),
                    position: Position::default(),
                }))
            },
        },
    }
}

/// Recognize a code span at `pos`: a backtick run, content, and a closer
/// run of exactly the same length. Content has space and newline runs
/// collapsed to a single space. With no matching closer the run stays
/// literal text.
fn scan_code_span(text: &str, pos: usize) -> Option<ScanClaim> {
    let bytes = text.as_bytes();
    if pos > 0 && bytes[pos - 1] == b'`' {
        // Not at the start of a run; the run already declined.
        return None;
    }
    let mut open_end = pos;
    while open_end < bytes.len() && bytes[open_end] == b'`' {
        open_end += 1;
    }
    let open_len = open_end - pos;

    let mut i = open_end;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let close_start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        if i - close_start == open_len {
            let raw = &text[open_end..close_start];
            let content = normalize_code_content(raw);
            return Some(ScanClaim {
                end: i,
                span: Span::InlineCode(InlineCode {
                    content,
                    position: Position::default(),
                }),
            });
        }
    }
    None
}

/// Collapse runs of spaces and newlines in trimmed code content.
fn normalize_code_content(raw: &str) -> String {
    raw.trim()
        .split(|c| c == ' ' || c == '\n')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
