//! Extended block-level variants: tables, footnote definitions, front
//! matter
//!
//! Tables need one line of lookahead: the candidate rows are read
//! speculatively and the whole claim is rewound unless the second line
//! is a valid delimiter row, in which case the header-like line would
//! otherwise have been a paragraph. Footnote definitions are consumed
//! into the session table and leave no visible node.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::block::{Block, CellAlign, Table, TableCell, TableRow};
use crate::ast::document::{FootnoteDef, FrontMatter};
use crate::ast::position::Position;
use crate::ast::span::InlineContent;
use crate::session;
use crate::session::registry::{BlockOutcome, BlockRule};

#[cfg(test)]
use super::core::is_blank;
use super::cursor::SourceCursor;

// ============================================================================
// Tables
// ============================================================================

pub(crate) mod table {
    use super::*;

    static DELIM_PIECE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r":?-{3,}:?").expect("delimiter piece pattern is valid"));

    static DELIM_CELL: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^:?-{3,}:?$").expect("delimiter cell pattern is valid"));

    pub(crate) fn start(line: &str) -> bool {
        line.contains('|')
    }

    /// Every cell of a delimiter row is dashes with optional alignment
    /// colons; anything else sends the candidate back to the paragraph
    /// fallback.
    fn is_delimiter_row(line: &str) -> bool {
        let trimmed = line.trim();
        let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
        let inner = inner.strip_suffix('|').unwrap_or(inner);
        let mut any = false;
        for cell in inner.split('|') {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            if !DELIM_CELL.is_match(cell) {
                return false;
            }
            any = true;
        }
        any
    }

    fn parse_align(piece: &str) -> CellAlign {
        if piece.ends_with(':') {
            if piece.starts_with(':') {
                CellAlign::Center
            } else {
                CellAlign::Right
            }
        } else {
            CellAlign::Left
        }
    }

    fn read_row(line: &str, aligns: &[CellAlign], lineno: usize) -> TableRow {
        let cells: Vec<&str> = line
            .trim()
            .split('|')
            .filter(|cell| !cell.is_empty())
            .collect();
        let count = cells.len().max(aligns.len());
        let mut row_cells = Vec::with_capacity(count);
        for i in 0..count {
            let content = cells.get(i).map(|c| c.trim()).unwrap_or("");
            row_cells.push(TableCell {
                content: InlineContent::pending(content, lineno),
                align: aligns.get(i).copied().unwrap_or_default(),
                position: Position::single(lineno),
            });
        }
        TableRow {
            cells: row_cells,
            position: Position::single(lineno),
        }
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        let mark = cursor.mark();
        let start_line = cursor.next_line_number();
        let mut buffer = vec![cursor.take_line()?];
        while cursor.peek().map_or(false, |line| line.contains('|')) {
            match cursor.take_line() {
                Some(line) => buffer.push(line),
                None => break,
            }
        }
        if buffer.len() < 2 || !is_delimiter_row(&buffer[1]) {
            cursor.rewind(mark);
            return None;
        }

        let column_align: Vec<CellAlign> = DELIM_PIECE
            .find_iter(&buffer[1])
            .map(|m| parse_align(m.as_str()))
            .collect();
        let header = read_row(&buffer[0], &column_align, start_line);
        let rows: Vec<TableRow> = buffer[2..]
            .iter()
            .enumerate()
            .map(|(i, line)| read_row(line, &column_align, start_line + 2 + i))
            .collect();
        Some(BlockOutcome::Node(Block::Table(Table {
            header: Some(header),
            rows,
            column_align,
            position: Position::new(start_line, cursor.lineno()),
        })))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use rstest::rstest;

        #[rstest]
        #[case("| --- | :---: |", true)]
        #[case("--- | ---:", true)]
        #[case("| -- |", false)]
        #[case("| a --- b |", false)]
        #[case("no pipes at all", false)]
        fn test_delimiter_row(#[case] line: &str, #[case] expected: bool) {
            assert_eq!(is_delimiter_row(line), expected);
        }

        #[test]
        fn test_parse_align() {
            assert_eq!(parse_align("---"), CellAlign::Left);
            assert_eq!(parse_align(":---:"), CellAlign::Center);
            assert_eq!(parse_align("---:"), CellAlign::Right);
            assert_eq!(parse_align(":---"), CellAlign::Left);
        }

        #[test]
        fn test_row_pads_missing_cells() {
            let aligns = [CellAlign::Left, CellAlign::Center, CellAlign::Right];
            let row = read_row("| a | b |", &aligns, 3);
            assert_eq!(row.cells.len(), 3);
            assert_eq!(row.cells[2].content.raw_text(), "");
            assert_eq!(row.cells[2].align, CellAlign::Right);
        }
    }
}

pub fn table_rule() -> BlockRule {
    BlockRule {
        name: "table",
        priority: 72,
        start: table::start,
        read: table::read,
        interrupts_paragraph: false,
        interrupt_test: None,
    }
}

// ============================================================================
// Footnote definitions
// ============================================================================

pub(crate) mod footnote {
    use super::*;

    static PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^ {0,3}\[\^([a-zA-Z0-9#@]+)\]:\s*(.*)$").expect("footnote pattern is valid")
    });

    pub(crate) fn start(line: &str) -> bool {
        line.trim_start().starts_with("[^")
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        let line = cursor.peek()?.to_owned();
        let caps = PATTERN.captures(&line)?;
        let label = caps[1].to_string();
        let body = caps[2].to_string();
        cursor.advance(1);
        let lineno = cursor.lineno();
        let def = FootnoteDef {
            label,
            content: InlineContent::pending(body, lineno),
            position: Position::single(lineno),
        };
        session::with_active(|s| s.add_footnote(def));
        Some(BlockOutcome::Consumed)
    }
}

pub fn footnote_rule() -> BlockRule {
    BlockRule {
        name: "footnote",
        priority: 76,
        start: footnote::start,
        read: footnote::read,
        interrupts_paragraph: false,
        interrupt_test: None,
    }
}

// ============================================================================
// Front matter
// ============================================================================

/// Capture a leading `---` fence before block parsing starts. The
/// payload is opaque; an unterminated fence runs to the end of input.
pub(crate) fn read_front_matter(cursor: &mut SourceCursor) -> Option<FrontMatter> {
    if !cursor.peek().map_or(false, |line| line.starts_with("---")) {
        return None;
    }
    let mut closing = None;
    let mut k = 1;
    while let Some(line) = cursor.peek_at(k) {
        if line.starts_with("---") {
            closing = Some(k);
            break;
        }
        k += 1;
    }
    let (content_end, consumed) = match closing {
        Some(k) => (k, k + 1),
        None => (k.saturating_sub(1), k),
    };
    let mut lines = Vec::new();
    for i in 1..content_end {
        lines.push(cursor.peek_at(i).unwrap_or("").to_string());
    }
    cursor.advance(consumed);
    Some(FrontMatter {
        content: lines.join("\n"),
        position: Position::new(1, consumed),
    })
}
