//! Integration tests for the core span-level variants and the
//! precedence/delimiter-stack resolution.

use marq::{parse, Span};

fn spans(text: &str) -> Vec<Span> {
    let doc = parse(text);
    let para = doc.children[0].as_paragraph().expect("paragraph");
    para.content.spans().to_vec()
}

fn raw(span: &Span) -> &str {
    &span.as_raw_text().expect("raw text").content
}

#[test]
fn test_precedence_code_span_over_emphasis() {
    // The classic precedence fixture: the backtick claim wins and the
    // opening star stays literal.
    let spans = spans("*foo `bar* baz`\n");
    assert_eq!(spans.len(), 2);
    assert_eq!(raw(&spans[0]), "*foo ");
    assert_eq!(spans[1].as_inline_code().expect("code").content, "bar* baz");
}

#[test]
fn test_rule_of_3() {
    let spans = spans("***foo** bar*\n");
    assert_eq!(spans.len(), 1);
    let Span::Emphasis(em) = &spans[0] else {
        panic!("expected emphasis, got {:?}", spans[0]);
    };
    assert!(matches!(&em.children[0], Span::Strong(_)));
    assert_eq!(raw(&em.children[1]), " bar");
}

#[test]
fn test_nested_emphasis_in_strong() {
    let spans = spans("**a *b* c**\n");
    let Span::Strong(strong) = &spans[0] else {
        panic!("expected strong, got {:?}", spans[0]);
    };
    assert_eq!(raw(&strong.children[0]), "a ");
    assert!(matches!(&strong.children[1], Span::Emphasis(_)));
    assert_eq!(raw(&strong.children[2]), " c");
}

#[test]
fn test_underscore_does_not_work_intraword() {
    let spans = spans("snake_case_name\n");
    assert_eq!(spans.len(), 1);
    assert_eq!(raw(&spans[0]), "snake_case_name");
}

#[test]
fn test_escape_sequences() {
    let spans = spans("\\*literal\\* stars\n");
    let Span::Escape(first) = &spans[0] else {
        panic!("expected escape, got {:?}", spans[0]);
    };
    assert_eq!(first.content, "*");
    assert_eq!(raw(&spans[1]), "literal");
    assert!(matches!(&spans[2], Span::Escape(_)));
    assert_eq!(raw(&spans[3]), " stars");
}

#[test]
fn test_code_span_with_unmatched_closer_stays_literal() {
    let spans = spans("``not closed`\n");
    assert_eq!(spans.len(), 1);
    assert_eq!(raw(&spans[0]), "``not closed`");
}

#[test]
fn test_autolinks() {
    let spans = spans("<https://example.com> and <user@example.com>\n");
    let Span::AutoLink(url) = &spans[0] else {
        panic!("expected autolink, got {:?}", spans[0]);
    };
    assert_eq!(url.target, "https://example.com");
    assert!(!url.mailto);
    let Span::AutoLink(mail) = &spans[2] else {
        panic!("expected autolink, got {:?}", spans[2]);
    };
    assert_eq!(mail.target, "user@example.com");
    assert!(mail.mailto);
}

#[test]
fn test_html_span_kept_literal() {
    let spans = spans("a <b class=\"x\">bold</b> tag\n");
    let Span::HtmlSpan(open) = &spans[1] else {
        panic!("expected html span, got {:?}", spans[1]);
    };
    assert_eq!(open.content, "<b class=\"x\">");
    assert_eq!(raw(&spans[2]), "bold");
    assert!(matches!(&spans[3], Span::HtmlSpan(_)));
}

#[test]
fn test_hard_and_soft_line_breaks() {
    let spans = spans("hard  \nsoft\nend\n");
    let Span::LineBreak(hard) = &spans[1] else {
        panic!("expected line break, got {:?}", spans[1]);
    };
    assert!(!hard.soft);
    let Span::LineBreak(soft) = &spans[3] else {
        panic!("expected line break, got {:?}", spans[3]);
    };
    assert!(soft.soft);
}

#[test]
fn test_backslash_hard_break() {
    let spans = spans("one\\\ntwo\n");
    let Span::LineBreak(brk) = &spans[1] else {
        panic!("expected line break, got {:?}", spans[1]);
    };
    assert!(!brk.soft);
}

#[test]
fn test_inline_link_and_image() {
    let spans = spans("[text](url \"title\") and ![alt](src)\n");
    let Span::Link(link) = &spans[0] else {
        panic!("expected link, got {:?}", spans[0]);
    };
    assert_eq!(link.target, "url");
    assert_eq!(link.title, "title");
    let Span::Image(image) = &spans[2] else {
        panic!("expected image, got {:?}", spans[2]);
    };
    assert_eq!(image.src, "src");
    assert_eq!(image.title, "");
}

#[test]
fn test_link_interior_is_parsed() {
    let spans = spans("[has *em*](url)\n");
    let Span::Link(link) = &spans[0] else {
        panic!("expected link, got {:?}", spans[0]);
    };
    assert_eq!(raw(&link.children[0]), "has ");
    assert!(matches!(&link.children[1], Span::Emphasis(_)));
}

#[test]
fn test_links_do_not_nest() {
    // The inner bracket pair resolves; the outer opener is invalidated
    // and stays literal.
    let spans = spans("[outer [inner](url)](other)\n");
    assert_eq!(raw(&spans[0]), "[outer ");
    assert!(matches!(&spans[1], Span::Link(_)));
    assert_eq!(raw(&spans[2]), "](other)");
}

#[test]
fn test_malformed_inline_tail_degrades() {
    let spans = spans("[text](no closing\n");
    assert_eq!(spans.len(), 1);
    assert_eq!(raw(&spans[0]), "[text](no closing");
}

#[test]
fn test_emphasis_across_link_boundary_does_not_pair() {
    let spans = spans("*a [b* c](url)\n");
    // The star inside the link content cannot close the outer opener.
    assert_eq!(raw(&spans[0]), "*a ");
    let Span::Link(link) = &spans[1] else {
        panic!("expected link, got {:?}", spans[1]);
    };
    assert_eq!(raw(&link.children[0]), "b* c");
}
