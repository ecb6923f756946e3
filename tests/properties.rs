//! Engine-level properties: termination on adversarial input,
//! determinism, and idempotent span expansion.

use proptest::prelude::*;

use marq::ast::block::Block;
use marq::ast::span::InlineContent;
use marq::spans::tokenizer::expand_blocks;
use marq::{parse, parse_extended};

/// Every boundary block in a finished tree must hold expanded content;
/// a surviving span container is a defect.
fn assert_no_pending(blocks: &[Block]) {
    fn check_content(content: &InlineContent) {
        assert!(content.is_expanded(), "span container survived expansion");
    }
    for block in blocks {
        match block {
            Block::Paragraph(p) => check_content(&p.content),
            Block::Heading(h) => check_content(&h.content),
            Block::Quote(q) => assert_no_pending(&q.children),
            Block::List(l) => {
                for item in &l.items {
                    assert_no_pending(&item.children);
                }
            }
            Block::Table(t) => {
                for row in t.header.iter().chain(t.rows.iter()) {
                    for cell in &row.cells {
                        check_content(&cell.content);
                    }
                }
            }
            Block::Custom(c) => {
                if let Some(content) = &c.content {
                    check_content(content);
                }
                assert_no_pending(&c.children);
            }
            _ => {}
        }
    }
}

#[test]
fn test_progress_on_a_file_of_stars() {
    // The block tokenizer must consume at least one line per iteration
    // even on degenerate input; this returns rather than spinning.
    let one_line = "*".repeat(4000);
    let doc = parse(&one_line);
    assert_eq!(doc.children.len(), 1);

    let many_lines = format!("{}\n", "****\n".repeat(500));
    let doc = parse(&many_lines);
    assert!(!doc.children.is_empty());
}

#[test]
fn test_progress_on_degenerate_delimiter_soup() {
    for pathological in [
        "[[[[[[[[[[",
        "]]]]]]]]]]",
        "``````````",
        "~~~~~~~~~~x",
        "********** **********",
        "> > > > > >",
        "- - - -\n-\n-\n",
    ] {
        let doc = parse_extended(pathological);
        assert_no_pending(&doc.children);
    }
}

#[test]
fn test_expansion_is_idempotent() {
    let mut doc = parse_extended("# h\n\npara *em* [x](y)\n\n- item\n\n| a |\n| --- |\n| b |\n");
    assert_no_pending(&doc.children);
    let before = doc.children.clone();
    // A second expansion pass over an already-expanded tree is a no-op.
    expand_blocks(&mut doc.children);
    assert_eq!(doc.children, before);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_parse_terminates_and_expands(input in markdown_soup()) {
        let doc = parse_extended(&input);
        assert_no_pending(&doc.children);
    }

    #[test]
    fn prop_parse_is_deterministic(input in markdown_soup()) {
        let first = parse_extended(&input);
        let second = parse_extended(&input);
        prop_assert_eq!(first.children, second.children);
        prop_assert_eq!(first.footnote_order, second.footnote_order);
    }

    #[test]
    fn prop_positions_are_ordered(input in markdown_soup()) {
        let doc = parse_extended(&input);
        let mut last = 0usize;
        for block in &doc.children {
            let position = block.position();
            prop_assert!(position.start_line >= last);
            prop_assert!(position.end_line >= position.start_line);
            last = position.start_line;
        }
    }
}

/// Fragments weighted toward the characters the tokenizers care about.
fn markdown_soup() -> impl Strategy<Value = String> {
    const FRAGMENTS: &[&str] = &[
        "*", "**", "_", "`", "``", "[", "]", "(", ")", "#", "# ", "-", "- ", ">", "> ", "|",
        "~~", "$", "\\", "^", ":", "word", " ", "\n", "\n\n",
    ];
    proptest::collection::vec(proptest::sample::select(FRAGMENTS.to_vec()), 0..80)
        .prop_map(|parts| parts.concat())
}
