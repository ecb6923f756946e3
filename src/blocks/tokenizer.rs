//! The block tokenizer: priority loop and paragraph fallback
//!
//! At each cursor position the active block variants are tried in
//! priority order: the fast test filters candidates, the recognizer
//! either consumes a complete node or declines with the cursor
//! untouched. A line nothing claims is absorbed into the fallback
//! paragraph, which grows until a blank line, a setext underline, or a
//! line starting a paragraph-interrupting variant.
//!
//! Forward progress is an engine invariant, not a convention: a
//! recognizer that matches without consuming a line is a defect and
//! stops the parse fatally instead of spinning.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::block::{Block, Heading, Paragraph};
use crate::ast::position::Position;
use crate::ast::span::InlineContent;
use crate::session;
use crate::session::registry::{BlockOutcome, BlockRule};

use super::core::is_blank;
use super::cursor::SourceCursor;

/// The result of tokenizing one line range: the nodes, plus whether any
/// blank line was consumed outside a node (list items use this for
/// looseness classification).
#[derive(Debug, Default)]
pub struct BlockBuffer {
    pub nodes: Vec<Block>,
    pub loose: bool,
}

/// Tokenize the cursor's remaining lines against the active session's
/// block variants. `parse_setext` is disabled for quote interiors.
pub fn tokenize_blocks(cursor: &mut SourceCursor, parse_setext: bool) -> BlockBuffer {
    let tokens = session::active_tokens();
    let rules = tokens.block_rules();
    let mut buffer = BlockBuffer::default();

    while let Some(line) = cursor.peek().map(str::to_owned) {
        if is_blank(&line) {
            cursor.advance(1);
            buffer.loose = true;
            continue;
        }
        let before = cursor.mark();
        let mut claimed = false;
        for rule in rules {
            if !(rule.start)(&line) {
                continue;
            }
            match (rule.read)(cursor) {
                Some(outcome) => {
                    assert!(
                        cursor.mark() > before,
                        "block variant '{}' matched without consuming any line",
                        rule.name
                    );
                    if let BlockOutcome::Node(node) = outcome {
                        buffer.nodes.push(node);
                    }
                    claimed = true;
                    break;
                }
                None => {
                    debug_assert!(
                        cursor.mark() == before,
                        "block variant '{}' declined but moved the cursor",
                        rule.name
                    );
                }
            }
        }
        if !claimed {
            buffer.nodes.push(read_paragraph(cursor, rules, parse_setext));
        }
    }
    buffer
}

static SETEXT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(=+|-+) *$").expect("setext pattern is valid"));

/// Absorb lines into a paragraph until something ends it. A setext
/// underline converts the accumulated lines into a heading instead.
fn read_paragraph(cursor: &mut SourceCursor, rules: &[BlockRule], parse_setext: bool) -> Block {
    let start_line = cursor.next_line_number();
    let mut buffer = Vec::new();
    if let Some(first) = cursor.take_line() {
        buffer.push(first);
    }

    loop {
        let Some(next) = cursor.peek().map(str::to_owned) else {
            break;
        };
        if is_blank(&next) {
            break;
        }
        if parse_setext {
            if let Some(caps) = SETEXT_PATTERN.captures(&next) {
                cursor.advance(1);
                let level = if caps[1].starts_with('=') { 1 } else { 2 };
                let content = buffer
                    .iter()
                    .map(|line| line.trim())
                    .collect::<Vec<_>>()
                    .join("\n");
                return Block::Heading(Heading {
                    level,
                    setext: true,
                    content: InlineContent::pending(content, start_line),
                    position: Position::new(start_line, cursor.lineno()),
                });
            }
        }
        if rules.iter().any(|rule| rule.interrupts(&next)) {
            break;
        }
        match cursor.take_line() {
            Some(line) => buffer.push(line),
            None => break,
        }
    }

    let content = buffer
        .iter()
        .map(|line| line.trim_start())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    Block::Paragraph(Paragraph {
        content: InlineContent::pending(content, start_line),
        position: Position::new(start_line, cursor.lineno()),
    })
}
