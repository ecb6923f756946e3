//! Bracket resolution helpers for links and images
//!
//! The span tokenizer pushes a marker for every `[` / `![` it scans; when
//! it reaches a `]` the helpers here parse what follows: first the inline
//! form `(target "title")`, then the reference forms `[key]`, `[]` and
//! the bare shortcut, resolved case-insensitively against the session's
//! link table. An unresolved reference is not an error; the caller
//! degrades the brackets to literal text.

use crate::session;

/// A successfully parsed link tail.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinkTail {
    /// Byte offset one past the consumed tail (after `)` or the closing
    /// `]` of a reference, or just past `]` for a shortcut).
    pub end: usize,
    pub target: String,
    pub title: String,
}

/// Normalize a reference label: trim, collapse interior whitespace to a
/// single space, case-fold.
pub(crate) fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolve the tail after a `]` at `close_pos`. `content` is the literal
/// text between the opening bracket and the `]`, used for collapsed and
/// shortcut references.
pub(crate) fn resolve_link_tail(text: &str, close_pos: usize, content: &str) -> Option<LinkTail> {
    let bytes = text.as_bytes();
    match bytes.get(close_pos + 1).copied() {
        Some(b'(') => {
            if let Some(tail) = parse_inline_tail(text, close_pos + 1) {
                return Some(tail);
            }
            // A malformed inline tail can still resolve as a shortcut.
            lookup(content, close_pos + 1)
        }
        Some(b'[') => {
            let (label, after) = parse_reference_label(text, close_pos + 1)?;
            if label.trim().is_empty() {
                // Collapsed reference: `[content][]`.
                lookup(content, after)
            } else {
                lookup(&label, after)
            }
        }
        _ => lookup(content, close_pos + 1),
    }
}

fn lookup(label: &str, end: usize) -> Option<LinkTail> {
    let key = normalize_label(label);
    let def = session::with_active(|s| s.link_definition(&key))?;
    Some(LinkTail {
        end,
        target: def.target,
        title: def.title,
    })
}

/// Parse `(dest "title")` starting at the opening parenthesis.
fn parse_inline_tail(text: &str, open_paren: usize) -> Option<LinkTail> {
    let mut pos = shift_whitespace(text, open_paren + 1);
    let dest = if text.as_bytes().get(pos) == Some(&b'<') {
        let (dest, after) = scan_angle_dest(text, pos)?;
        pos = after;
        dest
    } else {
        let (dest, after) = scan_plain_dest(text, pos)?;
        pos = after;
        dest
    };
    pos = shift_whitespace(text, pos);
    let title = match text.as_bytes().get(pos) {
        Some(&b'"') | Some(&b'\'') | Some(&b'(') => {
            let closing = if text.as_bytes()[pos] == b'(' {
                ')'
            } else {
                text.as_bytes()[pos] as char
            };
            let (title, after) = scan_delimited(text, pos + 1, closing)?;
            pos = shift_whitespace(text, after);
            title
        }
        _ => String::new(),
    };
    if text.as_bytes().get(pos) != Some(&b')') {
        return None;
    }
    Some(LinkTail {
        end: pos + 1,
        target: strip_escapes_str(dest.trim()),
        title: strip_escapes_str(&title),
    })
}

/// `<dest>` destination: no line endings or unescaped `<` inside.
fn scan_angle_dest(text: &str, open: usize) -> Option<(String, usize)> {
    let mut escaped = false;
    for (i, c) in text[open + 1..].char_indices() {
        let i = i + open + 1;
        if c == '\\' && !escaped {
            escaped = true;
        } else if c == '\n' || (c == '<' && !escaped) {
            return None;
        } else if c == '>' && !escaped {
            return Some((text[open + 1..i].to_string(), i + 1));
        } else if escaped {
            escaped = false;
        }
    }
    None
}

/// Bare destination: runs to whitespace or the unbalanced closing
/// parenthesis, with balanced interior parens allowed.
fn scan_plain_dest(text: &str, start: usize) -> Option<(String, usize)> {
    let mut depth = 0i32;
    let mut escaped = false;
    let mut end = text.len();
    for (i, c) in text[start..].char_indices() {
        let i = i + start;
        if c == '\\' && !escaped {
            escaped = true;
        } else if c.is_whitespace() {
            end = i;
            break;
        } else if !escaped {
            if c == '(' {
                depth += 1;
            } else if c == ')' {
                if depth == 0 {
                    end = i;
                    break;
                }
                depth -= 1;
            }
        } else {
            escaped = false;
        }
    }
    if depth != 0 {
        return None;
    }
    Some((text[start..end].to_string(), end))
}

/// A quoted or parenthesized title, from just after its opening delimiter.
fn scan_delimited(text: &str, start: usize, closing: char) -> Option<(String, usize)> {
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        let i = i + start;
        if c == '\\' && !escaped {
            escaped = true;
        } else if c == closing && !escaped {
            return Some((text[start..i].to_string(), i + c.len_utf8()));
        } else if escaped {
            escaped = false;
        }
    }
    None
}

/// The label of a full reference: `[label]` starting at the opening
/// bracket. Labels are capped at 999 characters and may not contain an
/// unescaped `[`.
fn parse_reference_label(text: &str, open: usize) -> Option<(String, usize)> {
    let mut escaped = false;
    for (i, c) in text[open + 1..].char_indices() {
        let i = i + open + 1;
        if i - open > 1001 {
            return None;
        }
        if c == '\\' && !escaped {
            escaped = true;
        } else if c == '[' && !escaped {
            return None;
        } else if c == ']' && !escaped {
            return Some((text[open + 1..i].to_string(), i + 1));
        } else if escaped {
            escaped = false;
        }
    }
    None
}

/// Skip whitespace (including newlines) from `pos`.
pub(crate) fn shift_whitespace(text: &str, mut pos: usize) -> usize {
    while let Some(c) = text[pos..].chars().next() {
        if !c.is_whitespace() {
            break;
        }
        pos += c.len_utf8();
    }
    pos
}

fn strip_escapes_str(s: &str) -> String {
    super::core::strip_escapes(s)
}
