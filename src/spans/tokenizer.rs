//! The span tokenizer: precedence sweep, delimiter stack, tree assembly
//!
//! Expansion scans a container's text left to right. At each position the
//! active span variants are consulted in precedence order (declaration
//! order on ties) and the first claim wins; unclaimed text becomes raw
//! text. Delimiter runs and brackets are not claims in themselves; the
//! core machinery records them as scan items and resolves them later:
//! brackets at their closing `]`, emphasis through the delimiter stack
//! when a bracket region or the whole container is complete. A flat item
//! list with open/close markers is then folded into the span tree.
//!
//! Every claim must consume at least one byte; a variant that claims
//! empty input is a defect and the engine stops it fatally rather than
//! loop.

use std::ops::Range;

use crate::ast::block::Block;
use crate::ast::position::Position;
use crate::ast::span::{
    Emphasis, Image, InlineContent, Link, RawText, Span, Strong,
};
use crate::session;
use crate::session::registry::{SpanMatcher, SpanRule};

use super::{emphasis, links};

// ============================================================================
// Expansion entry points
// ============================================================================

/// Expand every span container in a block subtree, in document order.
/// Already-expanded content is left untouched, so a second pass over the
/// same tree is a no-op.
pub fn expand_blocks(blocks: &mut [Block]) {
    for block in blocks {
        expand_block(block);
    }
}

fn expand_block(block: &mut Block) {
    match block {
        Block::Paragraph(p) => expand_content(&mut p.content),
        Block::Heading(h) => expand_content(&mut h.content),
        Block::Quote(q) => expand_blocks(&mut q.children),
        Block::List(l) => {
            for item in &mut l.items {
                expand_blocks(&mut item.children);
            }
        }
        Block::Table(t) => {
            if let Some(header) = &mut t.header {
                for cell in &mut header.cells {
                    expand_content(&mut cell.content);
                }
            }
            for row in &mut t.rows {
                for cell in &mut row.cells {
                    expand_content(&mut cell.content);
                }
            }
        }
        Block::Custom(c) => {
            if let Some(content) = &mut c.content {
                expand_content(content);
            }
            expand_blocks(&mut c.children);
        }
        Block::CodeFence(_)
        | Block::BlockCode(_)
        | Block::ThematicBreak(_)
        | Block::HtmlBlock(_) => {}
    }
}

/// Expand one container in place.
pub(crate) fn expand_content(content: &mut InlineContent) {
    let InlineContent::Pending(container) = content else {
        return;
    };
    let spans = expand_text(&container.text, container.start_line);
    *content = InlineContent::Expanded(spans);
}

/// Tokenize raw span text against the active session's variant set.
/// `start_line` is the source line of the first character, from which
/// every produced node derives its position.
pub fn expand_text(text: &str, start_line: usize) -> Vec<Span> {
    if text.is_empty() {
        return Vec::new();
    }
    let tokens = session::active_tokens();
    let linemap = LineMap::new(text, start_line);
    Scanner::new(text, 0, tokens.span_rules(), &linemap).run()
}

// ============================================================================
// Byte offset to source line mapping
// ============================================================================

struct LineMap {
    newline_offsets: Vec<usize>,
    start_line: usize,
}

impl LineMap {
    fn new(text: &str, start_line: usize) -> Self {
        Self {
            newline_offsets: text
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i)
                .collect(),
            start_line,
        }
    }

    fn line_at(&self, byte: usize) -> usize {
        self.start_line + self.newline_offsets.partition_point(|&n| n < byte)
    }
}

// ============================================================================
// Scan items
// ============================================================================

#[derive(Debug)]
struct DelimRun {
    marker: u8,
    range: Range<usize>,
    /// Unconsumed delimiter characters; pairing takes 2 then 1 per side
    /// and the remainder stays eligible for further matching.
    count: usize,
    can_open: bool,
    can_close: bool,
    /// Run sizes opened here, in pairing order (innermost first).
    open_runs: Vec<u8>,
    /// Run sizes closed here, in pairing order (innermost first).
    close_runs: Vec<u8>,
}

#[derive(Debug)]
enum Item {
    Text(Range<usize>),
    Node(Span),
    Delim(DelimRun),
    /// A `[` or `![` marker; degrades to literal text if never resolved.
    BracketOpen { range: Range<usize> },
    LinkOpen {
        is_image: bool,
        target: String,
        title: String,
        start: usize,
    },
    LinkClose {
        end: usize,
    },
}

#[derive(Debug)]
struct Bracket {
    item: usize,
    is_image: bool,
    /// Delimiter-stack height at the opener; emphasis inside the bracket
    /// region is processed against this bottom when the bracket closes.
    delim_bottom: usize,
    active: bool,
    content_start: usize,
}

// ============================================================================
// The scanner
// ============================================================================

/// Per-rule cursor over pattern matches: unknown, exhausted, or the
/// start of the next match at or past the last probe.
type MatchCache = Vec<Option<Option<usize>>>;

struct Scanner<'a> {
    text: &'a str,
    /// Byte offset of `text[0]` within the outermost container, for
    /// position mapping in nested sub-scans.
    abs_offset: usize,
    rules: &'a [SpanRule],
    linemap: &'a LineMap,
    items: Vec<Item>,
    delims: Vec<usize>,
    brackets: Vec<Bracket>,
    pos: usize,
    text_start: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, abs_offset: usize, rules: &'a [SpanRule], linemap: &'a LineMap) -> Self {
        Self {
            text,
            abs_offset,
            rules,
            linemap,
            items: Vec::new(),
            delims: Vec::new(),
            brackets: Vec::new(),
            pos: 0,
            text_start: 0,
        }
    }

    fn run(mut self) -> Vec<Span> {
        self.scan();
        self.process_emphasis(0);
        self.assemble()
    }

    fn scan(&mut self) {
        let mut cache: MatchCache = vec![None; self.rules.len()];
        while self.pos < self.text.len() {
            if self.try_claim(&mut cache) {
                continue;
            }
            let step = self.text[self.pos..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
            self.pos += step;
        }
        self.flush_text(self.pos);
    }

    /// Try every variant at the current position in precedence order.
    fn try_claim(&mut self, cache: &mut MatchCache) -> bool {
        let rules = self.rules;
        let text = self.text;
        let pos = self.pos;
        for (idx, rule) in rules.iter().enumerate() {
            match &rule.matcher {
                SpanMatcher::Pattern { regex, build } => {
                    let entry = &mut cache[idx];
                    let next_start = match entry {
                        Some(Some(start)) if *start >= pos => Some(*start),
                        Some(None) => None,
                        _ => {
                            let found = regex.find_at(text, pos).map(|m| m.start());
                            *entry = Some(found);
                            found
                        }
                    };
                    if next_start != Some(pos) {
                        continue;
                    }
                    let Some(caps) = regex.captures_at(text, pos) else {
                        continue;
                    };
                    let whole = caps.get(0).map(|m| m.end()).unwrap_or(pos);
                    let Some(mut span) = (build)(&caps) else {
                        // Declined; re-probe from a later position next time.
                        *entry = None;
                        continue;
                    };
                    assert!(
                        whole > pos,
                        "span variant '{}' claimed empty input at byte {}",
                        rule.name,
                        pos
                    );
                    if rule.parse_inner {
                        if let Some(group) = caps.get(rule.inner_group) {
                            let inner = Scanner::new(
                                &text[group.start()..group.end()],
                                self.abs_offset + group.start(),
                                rules,
                                self.linemap,
                            )
                            .run();
                            span.set_children(inner);
                        }
                    }
                    span.set_position(self.position_of(pos..whole));
                    self.flush_text(pos);
                    self.items.push(Item::Node(span));
                    self.pos = whole;
                    self.text_start = whole;
                    return true;
                }
                SpanMatcher::Scan { trigger, scan } => {
                    if text.as_bytes()[pos] != *trigger {
                        continue;
                    }
                    let Some(claim) = (scan)(text, pos) else {
                        continue;
                    };
                    assert!(
                        claim.end > pos,
                        "span variant '{}' claimed empty input at byte {}",
                        rule.name,
                        pos
                    );
                    let mut span = claim.span;
                    span.set_position(self.position_of(pos..claim.end));
                    self.flush_text(pos);
                    self.items.push(Item::Node(span));
                    self.pos = claim.end;
                    self.text_start = claim.end;
                    return true;
                }
                SpanMatcher::Core => {
                    if self.try_core() {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Delimiter runs and bracket markers.
    fn try_core(&mut self) -> bool {
        let pos = self.pos;
        let bytes = self.text.as_bytes();
        match bytes[pos] {
            b'*' | b'_' => {
                self.flush_text(pos);
                self.scan_delim_run(bytes[pos]);
                true
            }
            b'[' => {
                self.flush_text(pos);
                self.open_bracket(false, pos..pos + 1);
                true
            }
            b'!' if bytes.get(pos + 1) == Some(&b'[') => {
                self.flush_text(pos);
                self.open_bracket(true, pos..pos + 2);
                true
            }
            b']' => {
                self.flush_text(pos);
                self.close_bracket();
                true
            }
            _ => false,
        }
    }

    fn scan_delim_run(&mut self, marker: u8) {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        let mut end = start;
        while end < bytes.len() && bytes[end] == marker {
            end += 1;
        }
        let (can_open, can_close) = emphasis::classify_run(self.text, start, end, marker);
        self.delims.push(self.items.len());
        self.items.push(Item::Delim(DelimRun {
            marker,
            range: start..end,
            count: end - start,
            can_open,
            can_close,
            open_runs: Vec::new(),
            close_runs: Vec::new(),
        }));
        self.pos = end;
        self.text_start = end;
    }

    fn open_bracket(&mut self, is_image: bool, range: Range<usize>) {
        let content_start = range.end;
        self.brackets.push(Bracket {
            item: self.items.len(),
            is_image,
            delim_bottom: self.delims.len(),
            active: true,
            content_start,
        });
        self.items.push(Item::BracketOpen {
            range: range.clone(),
        });
        self.pos = range.end;
        self.text_start = range.end;
    }

    fn close_bracket(&mut self) {
        let close = self.pos;
        let Some(bracket) = self.brackets.pop() else {
            self.literal_close_bracket(close);
            return;
        };
        if !bracket.active {
            // Invalidated by an enclosing link that already resolved;
            // the opener stays behind as literal text.
            self.literal_close_bracket(close);
            return;
        }
        let content = &self.text[bracket.content_start..close];
        match links::resolve_link_tail(self.text, close, content) {
            Some(tail) => {
                if !bracket.is_image {
                    // Links may not nest; invalidate enclosing link openers.
                    for open in &mut self.brackets {
                        if !open.is_image {
                            open.active = false;
                        }
                    }
                }
                let start = match &self.items[bracket.item] {
                    Item::BracketOpen { range } => range.start,
                    _ => close,
                };
                self.items[bracket.item] = Item::LinkOpen {
                    is_image: bracket.is_image,
                    target: tail.target,
                    title: tail.title,
                    start,
                };
                self.process_emphasis(bracket.delim_bottom);
                self.delims.truncate(bracket.delim_bottom);
                self.items.push(Item::LinkClose { end: tail.end });
                self.pos = tail.end;
                self.text_start = tail.end;
            }
            None => {
                // Unresolved reference or malformed tail: the brackets
                // degrade to literal text, never an error.
                self.literal_close_bracket(close);
            }
        }
    }

    fn literal_close_bracket(&mut self, close: usize) {
        self.items.push(Item::Text(close..close + 1));
        self.pos = close + 1;
        self.text_start = self.pos;
    }

    /// Resolve emphasis over the delimiter stack above `stack_bottom`.
    /// Closers search backward for the nearest compatible opener, subject
    /// to the rule of 3; each match consumes two characters per side when
    /// both runs allow it (strong), otherwise one (emphasis), and the
    /// remainder stays available.
    fn process_emphasis(&mut self, stack_bottom: usize) {
        let mut closer_di = stack_bottom;
        while closer_di < self.delims.len() {
            let ci = self.delims[closer_di];
            let (cmarker, ccount, ccan_close, ccan_open) = match &self.items[ci] {
                Item::Delim(d) => (d.marker, d.count, d.can_close, d.can_open),
                _ => {
                    closer_di += 1;
                    continue;
                }
            };
            if !ccan_close || ccount == 0 {
                closer_di += 1;
                continue;
            }

            let mut found = None;
            let mut odi = closer_di;
            while odi > stack_bottom {
                odi -= 1;
                let oi = self.delims[odi];
                let Item::Delim(d) = &self.items[oi] else {
                    continue;
                };
                if d.marker != cmarker || !d.can_open || d.count == 0 {
                    continue;
                }
                if emphasis::forbidden_by_rule_of_3(d.count, d.can_close, ccount, ccan_open) {
                    continue;
                }
                found = Some(odi);
                break;
            }
            let Some(opener_di) = found else {
                closer_di += 1;
                continue;
            };

            let oi = self.delims[opener_di];
            let ocount = match &self.items[oi] {
                Item::Delim(d) => d.count,
                _ => 0,
            };
            let use_count = if ocount >= 2 && ccount >= 2 { 2 } else { 1 };
            if let Item::Delim(d) = &mut self.items[oi] {
                d.count -= use_count;
                d.open_runs.push(use_count as u8);
            }
            if let Item::Delim(d) = &mut self.items[ci] {
                d.count -= use_count;
                d.close_runs.push(use_count as u8);
            }

            // Delimiters strictly between the pair can no longer match
            // across it.
            if opener_di + 1 < closer_di {
                self.delims.drain(opener_di + 1..closer_di);
                closer_di = opener_di + 1;
            }
            if matches!(&self.items[self.delims[opener_di]], Item::Delim(d) if d.count == 0) {
                self.delims.remove(opener_di);
                closer_di -= 1;
            }
            if matches!(&self.items[self.delims[closer_di]], Item::Delim(d) if d.count == 0) {
                self.delims.remove(closer_di);
            }
        }
    }

    // ------------------------------------------------------------------
    // Assembly: fold the flat item list into a span tree
    // ------------------------------------------------------------------

    fn assemble(mut self) -> Vec<Span> {
        enum Frame {
            Emphasis { start: usize },
            Strong { start: usize },
            Link {
                is_image: bool,
                target: String,
                title: String,
                start: usize,
            },
        }

        let items = std::mem::take(&mut self.items);
        let mut out: Vec<Span> = Vec::new();
        let mut stack: Vec<(Frame, Vec<Span>)> = Vec::new();

        macro_rules! current {
            () => {
                stack.last_mut().map(|(_, spans)| spans).unwrap_or(&mut out)
            };
        }

        for item in items {
            match item {
                Item::Text(range) => {
                    let position = self.position_of(range.clone());
                    push_text(current!(), &self.text[range], position);
                }
                Item::Node(span) => current!().push(span),
                Item::BracketOpen { range } => {
                    let position = self.position_of(range.clone());
                    push_text(current!(), &self.text[range], position);
                }
                Item::LinkOpen {
                    is_image,
                    target,
                    title,
                    start,
                } => {
                    stack.push((
                        Frame::Link {
                            is_image,
                            target,
                            title,
                            start,
                        },
                        Vec::new(),
                    ));
                }
                Item::LinkClose { end } => {
                    if matches!(stack.last(), Some((Frame::Link { .. }, _))) {
                        if let Some((frame, children)) = stack.pop() {
                            let span = close_frame(frame, children, end, &self);
                            current!().push(span);
                        }
                    }
                }
                Item::Delim(run) => {
                    for _ in &run.close_runs {
                        if let Some((frame, children)) = stack.pop() {
                            let end = run.range.end;
                            let span = close_frame(frame, children, end, &self);
                            current!().push(span);
                        }
                    }
                    if run.count > 0 {
                        let marker = run.marker as char;
                        let content: String = std::iter::repeat(marker).take(run.count).collect();
                        let position = self.position_of(run.range.clone());
                        push_text(current!(), &content, position);
                    }
                    for &size in run.open_runs.iter().rev() {
                        let frame = if size == 2 {
                            Frame::Strong {
                                start: run.range.start,
                            }
                        } else {
                            Frame::Emphasis {
                                start: run.range.start,
                            }
                        };
                        stack.push((frame, Vec::new()));
                    }
                }
            }
        }

        // Unbalanced frames cannot arise from the pairing discipline, but
        // fold any children through rather than lose them.
        while let Some((_, children)) = stack.pop() {
            let target = stack.last_mut().map(|(_, spans)| spans).unwrap_or(&mut out);
            target.extend(children);
        }

        fn close_frame(frame: Frame, children: Vec<Span>, end: usize, scanner: &Scanner<'_>) -> Span {
            match frame {
                Frame::Emphasis { start } => Span::Emphasis(Emphasis {
                    children,
                    position: scanner.position_of(start..end),
                }),
                Frame::Strong { start } => Span::Strong(Strong {
                    children,
                    position: scanner.position_of(start..end),
                }),
                Frame::Link {
                    is_image,
                    target,
                    title,
                    start,
                } => {
                    let position = scanner.position_of(start..end);
                    if is_image {
                        Span::Image(Image {
                            src: target,
                            title,
                            children,
                            position,
                        })
                    } else {
                        Span::Link(Link {
                            target,
                            title,
                            children,
                            position,
                        })
                    }
                }
            }
        }

        out
    }

    fn flush_text(&mut self, upto: usize) {
        if self.text_start < upto {
            self.items.push(Item::Text(self.text_start..upto));
            self.text_start = upto;
        }
    }

    fn position_of(&self, range: Range<usize>) -> Position {
        let start = self.linemap.line_at(self.abs_offset + range.start);
        let last_byte = if range.end > range.start {
            range.end - 1
        } else {
            range.start
        };
        let end = self.linemap.line_at(self.abs_offset + last_byte);
        Position::new(start, end)
    }
}

fn push_text(list: &mut Vec<Span>, content: &str, position: Position) {
    if content.is_empty() {
        return;
    }
    if let Some(Span::RawText(last)) = list.last_mut() {
        last.content.push_str(content);
        last.position.end_line = position.end_line;
        return;
    }
    list.push(Span::RawText(RawText {
        content: content.to_string(),
        position,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::registry::TokenSet;
    use crate::session::{bind, ParseSession};

    fn expand(text: &str) -> Vec<Span> {
        let _guard = bind(ParseSession::new(TokenSet::core()));
        expand_text(text, 1)
    }

    fn raw(span: &Span) -> &str {
        match span {
            Span::RawText(t) => &t.content,
            other => panic!("expected raw text, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_is_one_raw_node() {
        let spans = expand("just words");
        assert_eq!(spans.len(), 1);
        assert_eq!(raw(&spans[0]), "just words");
    }

    #[test]
    fn test_code_span_beats_emphasis() {
        let spans = expand("*foo `bar* baz`");
        assert_eq!(spans.len(), 2);
        assert_eq!(raw(&spans[0]), "*foo ");
        match &spans[1] {
            Span::InlineCode(code) => assert_eq!(code.content, "bar* baz"),
            other => panic!("expected inline code, got {:?}", other),
        }
    }

    #[test]
    fn test_emphasis_and_strong() {
        let spans = expand("**bold** and *em*");
        match &spans[0] {
            Span::Strong(strong) => assert_eq!(raw(&strong.children[0]), "bold"),
            other => panic!("expected strong, got {:?}", other),
        }
        assert_eq!(raw(&spans[1]), " and ");
        match &spans[2] {
            Span::Emphasis(em) => assert_eq!(raw(&em.children[0]), "em"),
            other => panic!("expected emphasis, got {:?}", other),
        }
    }

    #[test]
    fn test_rule_of_3_pairing() {
        // ***foo** bar* is Emphasis(Strong(foo), " bar"), no stray star.
        let spans = expand("***foo** bar*");
        assert_eq!(spans.len(), 1);
        let Span::Emphasis(em) = &spans[0] else {
            panic!("expected emphasis, got {:?}", spans);
        };
        let Span::Strong(strong) = &em.children[0] else {
            panic!("expected strong first, got {:?}", em.children);
        };
        assert_eq!(raw(&strong.children[0]), "foo");
        assert_eq!(raw(&em.children[1]), " bar");
    }

    #[test]
    fn test_unmatched_delimiters_stay_literal() {
        let spans = expand("a * b");
        assert_eq!(spans.len(), 1);
        assert_eq!(raw(&spans[0]), "a * b");
    }

    #[test]
    fn test_escape_hides_delimiter() {
        let spans = expand(r"\*not em*");
        match &spans[0] {
            Span::Escape(esc) => assert_eq!(esc.content, "*"),
            other => panic!("expected escape, got {:?}", other),
        }
        assert_eq!(raw(&spans[1]), "not em*");
    }

    #[test]
    fn test_inline_link() {
        let spans = expand("see [docs](https://example.com \"Docs\") now");
        assert_eq!(raw(&spans[0]), "see ");
        match &spans[1] {
            Span::Link(link) => {
                assert_eq!(link.target, "https://example.com");
                assert_eq!(link.title, "Docs");
                assert_eq!(raw(&link.children[0]), "docs");
            }
            other => panic!("expected link, got {:?}", other),
        }
        assert_eq!(raw(&spans[2]), " now");
    }

    #[test]
    fn test_image() {
        let spans = expand("![alt](img.png)");
        match &spans[0] {
            Span::Image(image) => {
                assert_eq!(image.src, "img.png");
                assert_eq!(raw(&image.children[0]), "alt");
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_reference_degrades_to_literal() {
        let spans = expand("[text][missing]");
        assert_eq!(spans.len(), 1);
        assert_eq!(raw(&spans[0]), "[text][missing]");
    }

    #[test]
    fn test_emphasis_wraps_link() {
        let spans = expand("*a [b](c) d*");
        let Span::Emphasis(em) = &spans[0] else {
            panic!("expected emphasis, got {:?}", spans);
        };
        assert_eq!(raw(&em.children[0]), "a ");
        assert!(matches!(em.children[1], Span::Link(_)));
        assert_eq!(raw(&em.children[2]), " d");
    }

    #[test]
    fn test_positions_follow_newlines() {
        let spans = expand("one\n*two*");
        assert_eq!(spans[0].position(), Position::single(1));
        assert!(matches!(spans[1], Span::LineBreak(_)));
        assert_eq!(spans[2].position(), Position::single(2));
    }
}
