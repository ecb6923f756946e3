//! Built-in block-level variants for the CommonMark core set
//!
//! Each variant is a [`BlockRule`] capability record: a cheap per-line
//! fast test plus a full recognizer over the cursor. Recognizers either
//! consume the lines of a complete node or decline with the cursor
//! untouched; container variants (quote, list item) strip their
//! structural prefix and recurse the full tokenizer over the stripped
//! range. Link definitions consume lines into the session table and
//! leave no visible node.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::block::{
    Block, BlockCode, CodeFence, Heading, HtmlBlock, List, ListItem, Quote, ThematicBreak,
};
use crate::ast::document::LinkDef;
use crate::ast::position::Position;
use crate::ast::span::InlineContent;
use crate::session;
use crate::session::registry::{BlockOutcome, BlockRule};

use super::cursor::SourceCursor;
use super::tokenizer;

pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

// ============================================================================
// ATX headings
// ============================================================================

pub(crate) mod heading {
    use super::*;

    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^ {0,3}(#{1,6})(?: +(.*))?$").expect("heading pattern is valid"));

    pub(crate) fn start(line: &str) -> bool {
        PATTERN.is_match(line)
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        let line = cursor.take_line()?;
        let Some(caps) = PATTERN.captures(&line) else {
            cursor.backstep();
            return None;
        };
        let level = caps[1].len() as u8;
        let content = strip_closing_sequence(caps.get(2).map(|m| m.as_str()).unwrap_or(""));
        let lineno = cursor.lineno();
        Some(BlockOutcome::Node(Block::Heading(Heading {
            level,
            setext: false,
            content: InlineContent::pending(content, lineno),
            position: Position::single(lineno),
        })))
    }

    /// Trim a closing `#` run when preceded by whitespace; content that
    /// is nothing but `#` characters is empty.
    fn strip_closing_sequence(raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        if trimmed.bytes().all(|b| b == b'#') {
            return String::new();
        }
        let bytes = trimmed.as_bytes();
        let mut i = bytes.len();
        while i > 0 && bytes[i - 1] == b'#' {
            i -= 1;
        }
        if i < bytes.len() && i > 0 && bytes[i - 1] == b' ' {
            return trimmed[..i].trim_end().to_string();
        }
        trimmed.to_string()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_closing_sequence() {
            assert_eq!(strip_closing_sequence("some heading ###"), "some heading");
            assert_eq!(strip_closing_sequence("heading#"), "heading#");
            assert_eq!(strip_closing_sequence("###"), "");
            assert_eq!(strip_closing_sequence(""), "");
        }

        #[test]
        fn test_start() {
            assert!(start("# h1"));
            assert!(start("###### h6"));
            assert!(start("   ## indented"));
            assert!(start("##"));
            assert!(!start("####### seven"));
            assert!(!start("#no-space"));
            assert!(!start("    # code"));
        }
    }
}

pub fn heading_rule() -> BlockRule {
    BlockRule {
        name: "heading",
        priority: 30,
        start: heading::start,
        read: heading::read,
        interrupts_paragraph: true,
        interrupt_test: None,
    }
}

// ============================================================================
// Block quotes
// ============================================================================

pub(crate) mod quote {
    use super::*;

    pub(crate) fn start(line: &str) -> bool {
        indent_of(line) <= 3 && line.trim_start_matches(' ').starts_with('>')
    }

    fn transition(line: &str) -> bool {
        is_blank(line)
            || heading::start(line)
            || code_fence::start(line)
            || thematic_break::start(line)
            || list::start(line)
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        let start_line = cursor.next_line_number();
        let first = cursor.take_line()?;
        let Some(rest) = first.trim_start().splitn(2, '>').nth(1) else {
            cursor.backstep();
            return None;
        };
        let mut line = rest.to_string();
        if line.starts_with(' ') {
            line.remove(0);
        }

        let mut in_code_fence = code_fence::start(&line);
        let mut in_block_code = block_code::start(&line);
        let mut blank_line = is_blank(&line);
        let mut buffer = vec![line];

        loop {
            let Some(next) = cursor.peek().map(str::to_owned) else {
                break;
            };
            if transition(&next) {
                break;
            }
            let stripped = next.trim_start();
            if stripped.starts_with('>') {
                let mut prepend = 1;
                if stripped.as_bytes().get(1) == Some(&b' ') {
                    prepend = 2;
                }
                let content = stripped[prepend..].to_string();
                in_code_fence = code_fence::start(&content);
                in_block_code = block_code::start(&content);
                blank_line = is_blank(&content);
                buffer.push(content);
            } else if in_code_fence || in_block_code || blank_line {
                // Not paragraph continuation text.
                break;
            } else {
                // Lazy continuation, whitespace preserved.
                buffer.push(next);
            }
            cursor.advance(1);
        }

        // Block children are parsed here so that link definitions inside
        // quotes are recorded before span expansion; setext underlines do
        // not apply within quote interiors.
        let mut nested = SourceCursor::from_lines(buffer, start_line - 1);
        let children = tokenizer::tokenize_blocks(&mut nested, false);
        Some(BlockOutcome::Node(Block::Quote(Quote {
            children: children.nodes,
            position: Position::new(start_line, cursor.lineno()),
        })))
    }
}

pub fn quote_rule() -> BlockRule {
    BlockRule {
        name: "quote",
        priority: 40,
        start: quote::start,
        read: quote::read,
        interrupts_paragraph: true,
        interrupt_test: None,
    }
}

// ============================================================================
// Fenced code
// ============================================================================

pub(crate) mod code_fence {
    use super::*;

    static PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^( {0,3})((?:`|~){3,}) *([^`~ ]*) *([^`~]*)$").expect("fence pattern is valid")
    });

    pub(crate) fn start(line: &str) -> bool {
        PATTERN.is_match(line)
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        let start_line = cursor.next_line_number();
        let open = cursor.take_line()?;
        let Some(caps) = PATTERN.captures(&open) else {
            cursor.backstep();
            return None;
        };
        let open_indent = caps[1].len();
        let leader = caps[2].to_string();
        let language = crate::spans::core::strip_escapes(&caps[3]);
        let arguments = crate::spans::core::strip_escapes(&caps[4]);

        let mut buffer = Vec::new();
        while let Some(line) = cursor.take_line() {
            let stripped = line.trim_start_matches(' ');
            let diff = line.len() - stripped.len();
            if stripped.starts_with(&leader)
                && stripped.split_whitespace().count() == 1
                && diff < 4
            {
                break;
            }
            if diff > open_indent {
                buffer.push(format!("{}{}", " ".repeat(diff - open_indent), stripped));
            } else {
                buffer.push(stripped.to_string());
            }
        }

        let literal = if buffer.is_empty() {
            String::new()
        } else {
            format!("{}\n", buffer.join("\n"))
        };
        Some(BlockOutcome::Node(Block::CodeFence(CodeFence {
            language,
            arguments,
            literal,
            position: Position::new(start_line, cursor.lineno()),
        })))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_start() {
            assert!(start("```"));
            assert!(start("~~~~ ruby"));
            assert!(start("   ```python extra args"));
            assert!(!start("``"));
            assert!(!start("    ```"));
            // A backtick in the info string disqualifies the fence.
            assert!(!start("``` a`b"));
        }
    }
}

pub fn code_fence_rule() -> BlockRule {
    BlockRule {
        name: "code_fence",
        priority: 50,
        start: code_fence::start,
        read: code_fence::read,
        interrupts_paragraph: true,
        interrupt_test: None,
    }
}

// ============================================================================
// Indented code
// ============================================================================

pub(crate) mod block_code {
    use super::*;

    pub(crate) fn start(line: &str) -> bool {
        line.starts_with("    ") && !is_blank(line)
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        let start_line = cursor.next_line_number();
        let mut buffer = Vec::new();
        while let Some(line) = cursor.peek().map(str::to_owned) {
            if is_blank(&line) {
                cursor.advance(1);
                buffer.push(if line.len() <= 4 {
                    String::new()
                } else {
                    line[4..].to_string()
                });
                continue;
            }
            if !line.starts_with("    ") {
                break;
            }
            cursor.advance(1);
            buffer.push(line[4..].to_string());
        }
        if buffer.is_empty() {
            return None;
        }
        let literal = format!("{}\n", buffer.join("\n").trim_matches('\n'));
        Some(BlockOutcome::Node(Block::BlockCode(BlockCode {
            literal,
            position: Position::new(start_line, cursor.lineno()),
        })))
    }
}

pub fn block_code_rule() -> BlockRule {
    BlockRule {
        name: "block_code",
        priority: 20,
        start: block_code::start,
        read: block_code::read,
        interrupts_paragraph: false,
        interrupt_test: None,
    }
}

// ============================================================================
// Thematic breaks
// ============================================================================

pub(crate) mod thematic_break {
    use super::*;

    // Written as one alternation per marker character; the regex engine
    // has no backreferences.
    static PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^ {0,3}(?:(?:- *){3,}|(?:_ *){3,}|(?:\* *){3,})$")
            .expect("thematic break pattern is valid")
    });

    pub(crate) fn start(line: &str) -> bool {
        PATTERN.is_match(line)
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        cursor.take_line()?;
        Some(BlockOutcome::Node(Block::ThematicBreak(ThematicBreak {
            position: Position::single(cursor.lineno()),
        })))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use rstest::rstest;

        #[rstest]
        #[case("---", true)]
        #[case("***", true)]
        #[case("___", true)]
        #[case(" - - -  ", true)]
        #[case("--", false)]
        #[case("-*-", false)]
        #[case("    ---", false)]
        fn test_start(#[case] line: &str, #[case] expected: bool) {
            assert_eq!(start(line), expected);
        }
    }
}

pub fn thematic_break_rule() -> BlockRule {
    BlockRule {
        name: "thematic_break",
        priority: 60,
        start: thematic_break::start,
        read: thematic_break::read,
        interrupts_paragraph: true,
        interrupt_test: None,
    }
}

// ============================================================================
// Lists
// ============================================================================

pub(crate) mod list {
    use super::*;

    static START_PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^ {0,3}(?:\d{1,9}[.)]|[+*-])( *$| +)").expect("list start pattern is valid")
    });

    static MARKER_PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^( *)(\d{1,9}[.)]|[+*-])( *$| +)").expect("list marker pattern is valid")
    });

    pub(crate) fn start(line: &str) -> bool {
        START_PATTERN.is_match(line)
    }

    /// `(prepend, leader)` when the line carries a valid marker: the
    /// content column after the marker and its following spaces, and the
    /// marker text itself. More than four spaces after the marker count
    /// as one (the rest is indented code); a marker alone on its line
    /// also counts as one.
    pub(crate) fn parse_marker(line: &str) -> Option<(usize, String)> {
        let caps = MARKER_PATTERN.captures(line)?;
        let leader = caps[2].to_string();
        let whole_end = caps.get(0)?.end();
        let leader_end = caps.get(2)?.end();
        let mut prepend = whole_end;
        if prepend == line.len() {
            prepend = leader_end + 1;
        } else {
            let n_spaces = caps.get(3).map(|m| m.as_str().len()).unwrap_or(0);
            if n_spaces > 4 {
                prepend = leader_end + 1;
            }
        }
        Some((prepend, leader))
    }

    fn in_continuation(line: &str, prepend: usize) -> bool {
        is_blank(line) || indent_of(line) >= prepend
    }

    fn transition(line: &str) -> bool {
        heading::start(line)
            || quote::start(line)
            || code_fence::start(line)
            || thematic_break::start(line)
    }

    fn same_marker_type(a: &str, b: &str) -> bool {
        if a.len() == 1 {
            return a == b;
        }
        let ordered = |s: &str| s.len() > 1 && s[..s.len() - 1].bytes().all(|c| c.is_ascii_digit());
        ordered(a) && ordered(b) && a.as_bytes().last() == b.as_bytes().last()
    }

    /// Non-empty bullet items and ordered items starting at 1 interrupt
    /// an open paragraph.
    pub(crate) fn interrupts(line: &str) -> bool {
        if indent_of(line) >= 4 {
            return false;
        }
        let Some((prepend, leader)) = parse_marker(line) else {
            return false;
        };
        if !line.get(..prepend).map_or(false, |s| s.ends_with(' ')) {
            return false;
        }
        let ordered = leader.len() > 1;
        !ordered || &leader[..leader.len() - 1] == "1"
    }

    fn read_item(
        cursor: &mut SourceCursor,
        prev_marker: Option<(usize, String)>,
    ) -> Option<(ListItem, Option<(usize, String)>)> {
        let mut next_marker = None;
        let start_line = cursor.next_line_number();
        let line = cursor.take_line()?;
        let (prepend, leader) = match prev_marker {
            Some(marker) => marker,
            None => match parse_marker(&line) {
                Some(marker) => marker,
                None => {
                    cursor.backstep();
                    return None;
                }
            },
        };

        let rest = line.get(prepend..).unwrap_or("");
        let empty_first_line = rest.trim().is_empty();
        let mut buffer: Vec<String> = Vec::new();
        if !empty_first_line {
            buffer.push(rest.to_string());
        }

        let next_line = cursor.peek().map(str::to_owned);
        if empty_first_line && matches!(&next_line, Some(l) if is_blank(l)) {
            // An empty item directly followed by a blank line closes
            // immediately.
            let blank = cursor.take_line().unwrap_or_default();
            let mut nested = SourceCursor::from_lines(vec![blank], cursor.lineno() - 1);
            let children = tokenizer::tokenize_blocks(&mut nested, true);
            if let Some(next) = cursor.peek() {
                next_marker = parse_marker(next);
            }
            let item = ListItem {
                children: children.nodes,
                loose: children.loose,
                leader,
                position: Position::new(start_line, cursor.lineno()),
            };
            return Some((item, next_marker));
        }

        let mut newline = 0usize;
        let mut next_line = next_line;
        loop {
            let Some(next) = next_line else {
                if newline > 0 {
                    cursor.backstep();
                    buffer.truncate(buffer.len().saturating_sub(newline));
                }
                break;
            };
            if !in_continuation(&next, prepend) {
                if transition(&next) {
                    if newline > 0 {
                        cursor.backstep();
                        buffer.truncate(buffer.len().saturating_sub(newline));
                    }
                    break;
                }
                if let Some(marker) = parse_marker(&next) {
                    next_marker = Some(marker);
                    break;
                }
                if newline > 0 {
                    cursor.backstep();
                    buffer.truncate(buffer.len().saturating_sub(newline));
                    break;
                }
            }
            cursor.advance(1);
            let stripped = next.trim_start_matches(' ');
            let diff = next.len() - stripped.len();
            if diff > prepend {
                buffer.push(format!("{}{}", " ".repeat(diff - prepend), stripped));
            } else {
                buffer.push(stripped.to_string());
            }
            newline = if is_blank(&next) { newline + 1 } else { 0 };
            next_line = cursor.peek().map(str::to_owned);
        }

        let mut nested = SourceCursor::from_lines(buffer, start_line - 1);
        let children = tokenizer::tokenize_blocks(&mut nested, true);
        let item = ListItem {
            children: children.nodes,
            loose: children.loose,
            leader,
            position: Position::new(start_line, cursor.lineno()),
        };
        Some((item, next_marker))
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        let start_line = cursor.next_line_number();
        let mut items: Vec<ListItem> = Vec::new();
        let mut leader: Option<String> = None;
        let mut next_marker: Option<(usize, String)> = None;
        loop {
            let mark = cursor.mark();
            let Some((item, marker)) = read_item(cursor, next_marker.take()) else {
                break;
            };
            match &leader {
                None => leader = Some(item.leader.clone()),
                Some(first) if !same_marker_type(first, &item.leader) => {
                    cursor.rewind(mark);
                    break;
                }
                _ => {}
            }
            items.push(item);
            next_marker = marker;
            if next_marker.is_none() {
                break;
            }
        }
        if items.is_empty() {
            return None;
        }

        // The last item only counts as loose when the blank sits between
        // its own children.
        if let Some(last) = items.last_mut() {
            last.loose = last.children.len() > 1 && last.loose;
        }
        let loose = items.iter().any(|item| item.loose);
        let first_leader = items[0].leader.clone();
        let start_at = if first_leader.len() > 1 {
            first_leader[..first_leader.len() - 1].parse::<u64>().ok()
        } else {
            None
        };
        Some(BlockOutcome::Node(Block::List(List {
            items,
            loose,
            start_at,
            position: Position::new(start_line, cursor.lineno()),
        })))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_marker() {
            assert_eq!(parse_marker("- item"), Some((2, "-".to_string())));
            assert_eq!(parse_marker("12. item"), Some((4, "12.".to_string())));
            // Marker alone: content column is one past the marker.
            assert_eq!(parse_marker("-"), Some((2, "-".to_string())));
            // More than four spaces after the marker count as one.
            assert_eq!(parse_marker("-      code"), Some((2, "-".to_string())));
            assert_eq!(parse_marker("no marker"), None);
        }

        #[test]
        fn test_interrupts() {
            assert!(interrupts("- item"));
            assert!(interrupts("1. item"));
            assert!(!interrupts("2. item"));
            assert!(!interrupts("-"));
        }

        #[test]
        fn test_same_marker_type() {
            assert!(same_marker_type("-", "-"));
            assert!(!same_marker_type("-", "*"));
            assert!(same_marker_type("1.", "7."));
            assert!(!same_marker_type("1.", "1)"));
        }
    }
}

pub fn list_rule() -> BlockRule {
    BlockRule {
        name: "list",
        priority: 70,
        start: list::start,
        read: list::read,
        interrupts_paragraph: true,
        interrupt_test: Some(list::interrupts),
    }
}

// ============================================================================
// Link definitions
// ============================================================================

pub(crate) mod link_definition {
    use super::*;

    pub(crate) fn start(line: &str) -> bool {
        line.trim_start().starts_with('[')
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        let mut buffer = Vec::new();
        while cursor.peek().map_or(false, |line| !is_blank(line)) {
            match cursor.take_line() {
                Some(line) => buffer.push(line),
                None => break,
            }
        }
        if buffer.is_empty() {
            return None;
        }
        // The trailing newline keeps the scanners' end-of-line checks
        // uniform for the last line.
        let string = format!("{}\n", buffer.join("\n"));

        let mut offset = 0;
        let mut defs: Vec<(String, String, String)> = Vec::new();
        while offset + 1 < string.len() {
            match match_reference(cursor, &string, offset) {
                Some((new_offset, def)) => {
                    offset = new_offset;
                    defs.push(def);
                }
                None => break,
            }
        }
        if defs.is_empty() {
            return None;
        }
        session::with_active(|s| {
            for (label, dest, title) in &defs {
                let key = crate::spans::links::normalize_label(label);
                s.add_link_definition(
                    key,
                    LinkDef {
                        target: crate::spans::core::strip_escapes(dest.trim()),
                        title: crate::spans::core::strip_escapes(title),
                    },
                );
            }
        });
        Some(BlockOutcome::Consumed)
    }

    fn match_reference(
        cursor: &mut SourceCursor,
        string: &str,
        offset: usize,
    ) -> Option<(usize, (String, String, String))> {
        let Some((_, label_end, label)) = match_link_label(string, offset) else {
            backtrack(cursor, string, offset);
            return None;
        };
        if string.as_bytes().get(label_end) != Some(&b':') {
            backtrack(cursor, string, offset);
            return None;
        }
        let Some((_, dest_end, dest)) = match_link_dest(string, label_end) else {
            backtrack(cursor, string, offset);
            return None;
        };
        let Some((_, title_end, title)) = match_link_title(string, dest_end) else {
            backtrack(cursor, string, dest_end);
            return None;
        };
        Some((title_end, (label, dest, title)))
    }

    /// Rewind the lines that the failed tail would otherwise swallow.
    fn backtrack(cursor: &mut SourceCursor, string: &str, offset: usize) {
        let unread = string
            .as_bytes()
            .get(offset + 1..)
            .map(|rest| rest.iter().filter(|&&b| b == b'\n').count())
            .unwrap_or(0);
        cursor.backstep_n(unread);
    }

    fn match_link_label(string: &str, offset: usize) -> Option<(usize, usize, String)> {
        let mut start = None;
        let mut escaped = false;
        for (i, c) in string[offset..].char_indices() {
            let i = i + offset;
            if c == '\\' && !escaped {
                escaped = true;
            } else if c == '[' && !escaped {
                if start.is_some() {
                    return None;
                }
                start = Some(i);
            } else if c == ']' && !escaped {
                let s = start?;
                let label = &string[s + 1..i];
                if label.trim().is_empty() {
                    return None;
                }
                return Some((s, i + 1, label.to_string()));
            } else if escaped {
                escaped = false;
            }
        }
        None
    }

    fn match_link_dest(string: &str, colon: usize) -> Option<(usize, usize, String)> {
        let offset = crate::spans::links::shift_whitespace(string, colon + 1);
        if offset == string.len() {
            return None;
        }
        if string.as_bytes()[offset] == b'<' {
            let mut escaped = false;
            for (i, c) in string[offset + 1..].char_indices() {
                let i = i + offset + 1;
                if c == '\\' && !escaped {
                    escaped = true;
                } else if c == ' ' || c == '\n' || (c == '<' && !escaped) {
                    return None;
                } else if c == '>' && !escaped {
                    return Some((offset, i + 1, string[offset + 1..i].to_string()));
                } else if escaped {
                    escaped = false;
                }
            }
            None
        } else {
            let mut escaped = false;
            let mut depth = 0i32;
            let mut end = string.len();
            for (i, c) in string[offset..].char_indices() {
                let i = i + offset;
                if c == '\\' && !escaped {
                    escaped = true;
                } else if c.is_whitespace() {
                    end = i;
                    break;
                } else if !escaped {
                    if c == '(' {
                        depth += 1;
                    } else if c == ')' {
                        depth -= 1;
                    }
                } else if c.is_control() {
                    return None;
                } else {
                    escaped = false;
                }
            }
            if depth != 0 {
                return None;
            }
            Some((offset, end, string[offset..end].to_string()))
        }
    }

    fn match_link_title(string: &str, offset: usize) -> Option<(usize, usize, String)> {
        let new_offset = crate::spans::links::shift_whitespace(string, offset);
        if new_offset == string.len()
            || (string[offset..new_offset].contains('\n')
                && string.as_bytes()[new_offset] == b'[')
        {
            return Some((offset, new_offset, String::new()));
        }
        let closing = match string.as_bytes()[new_offset] {
            b'"' => '"',
            b'\'' => '\'',
            b'(' => ')',
            _ => {
                if string[offset..new_offset].contains('\n') {
                    return Some((offset, offset, String::new()));
                }
                return None;
            }
        };
        let mut escaped = false;
        for (i, c) in string[new_offset + 1..].char_indices() {
            let i = i + new_offset + 1;
            if c == '\\' && !escaped {
                escaped = true;
            } else if c == closing && !escaped {
                let after = crate::spans::links::shift_whitespace(string, i + 1);
                // The title must end its line.
                if !string[i + 1..after].contains('\n') {
                    return None;
                }
                return Some((new_offset, after, string[new_offset + 1..i].to_string()));
            } else if escaped {
                escaped = false;
            }
        }
        None
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_match_label() {
            assert_eq!(
                match_link_label("[key]: target\n", 0),
                Some((0, 5, "key".to_string()))
            );
            assert_eq!(match_link_label("[ ]: target\n", 0), None);
            assert_eq!(match_link_label("no label\n", 0), None);
        }

        #[test]
        fn test_match_dest() {
            let s = "[k]: target \"title\"\n";
            let (_, end, dest) = match_link_dest(s, 3).expect("dest parses");
            assert_eq!(dest, "target");
            assert_eq!(&s[end..end + 1], " ");

            let s = "[k]: <bracketed>\n";
            let (_, _, dest) = match_link_dest(s, 3).expect("dest parses");
            assert_eq!(dest, "bracketed");
        }

        #[test]
        fn test_title_must_end_line() {
            let s = "[k]: t \"title\" trailing\n";
            assert!(match_link_title(s, 6).is_none());
            let s = "[k]: t \"title\"\n";
            assert!(match_link_title(s, 6).is_some());
        }
    }
}

pub fn link_definition_rule() -> BlockRule {
    BlockRule {
        name: "link_definition",
        priority: 80,
        start: link_definition::start,
        read: link_definition::read,
        interrupts_paragraph: false,
        interrupt_test: None,
    }
}

// ============================================================================
// HTML blocks
// ============================================================================

pub(crate) mod html_block {
    use super::*;

    const TAG: &str = "[A-Za-z][A-Za-z0-9-]*";
    const ATTRS: &str =
        r#"(?:\s+[A-Za-z_:][A-Za-z0-9_.:-]*(?:\s*=\s*(?:[^ "'=<>`]+|'[^']*'|"[^"]*"))?)*"#;

    static MULTIBLOCK: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^<(script|pre|style)(?:[ >]|$)").expect("multiblock pattern is valid")
    });

    static PREDEFINED: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^</?([A-Za-z][A-Za-z0-9-]*)(?:\s|/?>|$)").expect("predefined pattern is valid")
    });

    static CUSTOM_TAG: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!("^(?:<{TAG}{ATTRS} */?>|</{TAG} *>) *$"))
            .expect("custom tag pattern is valid")
    });

    const TAGS: &[&str] = &[
        "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption",
        "center", "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt",
        "fieldset", "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2",
        "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link",
        "main", "menu", "menuitem", "meta", "nav", "noframes", "ol", "optgroup", "option", "p",
        "param", "section", "source", "summary", "table", "tbody", "td", "tfoot", "th", "thead",
        "title", "tr", "track", "ul",
    ];

    /// The seven start conditions, with the end condition each implies:
    /// a closing substring, or `None` for "until a blank line".
    fn classify(line: &str) -> Option<(u8, Option<String>)> {
        let stripped = line.trim_start();
        if line.len() - stripped.len() >= 4 {
            return None;
        }
        if let Some(caps) = MULTIBLOCK.captures(stripped) {
            return Some((1, Some(format!("</{}>", caps[1].to_lowercase()))));
        }
        if stripped.starts_with("<!--") {
            return Some((2, Some("-->".to_string())));
        }
        if stripped.starts_with("<?") {
            return Some((3, Some("?>".to_string())));
        }
        if stripped.starts_with("<![CDATA[") {
            return Some((5, Some("]]>".to_string())));
        }
        if stripped.starts_with("<!")
            && stripped
                .as_bytes()
                .get(2)
                .map_or(false, u8::is_ascii_uppercase)
        {
            return Some((4, Some(">".to_string())));
        }
        if let Some(caps) = PREDEFINED.captures(stripped) {
            if TAGS.contains(&caps[1].to_lowercase().as_str()) {
                return Some((6, None));
            }
        }
        if CUSTOM_TAG.is_match(stripped) {
            return Some((7, None));
        }
        None
    }

    pub(crate) fn start(line: &str) -> bool {
        classify(line).is_some()
    }

    /// Condition 7 may not interrupt a paragraph.
    pub(crate) fn interrupt_test(line: &str) -> bool {
        classify(line).map_or(false, |(kind, _)| kind != 7)
    }

    pub(crate) fn read(cursor: &mut SourceCursor) -> Option<BlockOutcome> {
        let start_line = cursor.next_line_number();
        let first = cursor.peek()?.to_owned();
        let (_, end_condition) = classify(&first)?;
        let mut buffer = Vec::new();
        while let Some(line) = cursor.take_line() {
            match &end_condition {
                Some(cond) => {
                    let done = line.to_lowercase().contains(cond.as_str());
                    buffer.push(line);
                    if done {
                        break;
                    }
                }
                None => {
                    if is_blank(&line) {
                        break;
                    }
                    buffer.push(line);
                }
            }
        }
        Some(BlockOutcome::Node(Block::HtmlBlock(HtmlBlock {
            content: buffer.join("\n"),
            position: Position::new(start_line, cursor.lineno()),
        })))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_classify_kinds() {
            assert_eq!(classify("<script src=x>").map(|c| c.0), Some(1));
            assert_eq!(classify("<!-- note").map(|c| c.0), Some(2));
            assert_eq!(classify("<?php").map(|c| c.0), Some(3));
            assert_eq!(classify("<!DOCTYPE html>").map(|c| c.0), Some(4));
            assert_eq!(classify("<![CDATA[data").map(|c| c.0), Some(5));
            assert_eq!(classify("<div class=\"x\">").map(|c| c.0), Some(6));
            assert_eq!(classify("<custom-tag>").map(|c| c.0), Some(7));
            assert_eq!(classify("plain text"), None);
            assert_eq!(classify("    <div>"), None);
        }

        #[test]
        fn test_condition_seven_does_not_interrupt() {
            assert!(interrupt_test("<div>"));
            assert!(!interrupt_test("<custom-tag>"));
        }
    }
}

pub fn html_block_rule() -> BlockRule {
    BlockRule {
        name: "html_block",
        priority: 10,
        start: html_block::start,
        read: html_block::read,
        interrupts_paragraph: true,
        interrupt_test: Some(html_block::interrupt_test),
    }
}
