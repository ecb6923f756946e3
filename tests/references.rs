//! Integration tests for link definitions and reference resolution:
//! the two-phase parse lets references resolve regardless of where the
//! definition sits in the source.

use marq::{parse, Span};

#[test]
fn test_forward_reference_resolves_in_one_pass() {
    let doc = parse("a [text][key]\n\n[key]: link \"target\"\n");
    let para = doc.children[0].as_paragraph().expect("paragraph");
    let link = para
        .content
        .spans()
        .iter()
        .find_map(|span| span.as_link())
        .expect("link");
    assert_eq!(link.target, "link");
    assert_eq!(link.title, "target");
}

#[test]
fn test_definition_lines_leave_no_visible_node() {
    let doc = parse("[key]: target\n\nbody\n");
    assert_eq!(doc.children.len(), 1);
    assert!(doc.children[0].is_paragraph());
    assert_eq!(doc.link_definitions["key"].target, "target");
}

#[test]
fn test_keys_match_case_insensitively_with_collapsed_whitespace() {
    let doc = parse("[The   Key]\n\n[the key]: target\n");
    let para = doc.children[0].as_paragraph().expect("paragraph");
    let link = para
        .content
        .spans()
        .iter()
        .find_map(|span| span.as_link())
        .expect("shortcut reference resolves");
    assert_eq!(link.target, "target");
}

#[test]
fn test_first_definition_wins() {
    let doc = parse("[k]\n\n[k]: first\n\n[k]: second\n");
    assert_eq!(doc.link_definitions["k"].target, "first");
    let para = doc.children[0].as_paragraph().expect("paragraph");
    let link = para
        .content
        .spans()
        .iter()
        .find_map(|span| span.as_link())
        .expect("link");
    assert_eq!(link.target, "first");
}

#[test]
fn test_multiple_definitions_in_one_block() {
    let doc = parse("[a]: one\n[b]: two\n");
    assert_eq!(doc.link_definitions.len(), 2);
    assert_eq!(doc.link_definitions["a"].target, "one");
    assert_eq!(doc.link_definitions["b"].target, "two");
    assert!(doc.children.is_empty());
}

#[test]
fn test_angle_destination_and_paren_title() {
    let doc = parse("[k]: <target> (a title)\n");
    let def = &doc.link_definitions["k"];
    assert_eq!(def.target, "target");
    assert_eq!(def.title, "a title");
}

#[test]
fn test_malformed_definition_falls_back_to_paragraph() {
    let doc = parse("[not a def] trailing words\n");
    assert_eq!(doc.children.len(), 1);
    assert!(doc.children[0].is_paragraph());
    assert!(doc.link_definitions.is_empty());
}

#[test]
fn test_unresolved_reference_is_literal_text() {
    let doc = parse("[text][missing]\n");
    let para = doc.children[0].as_paragraph().expect("paragraph");
    assert_eq!(para.content.spans().len(), 1);
    assert_eq!(
        para.content.spans()[0].as_raw_text().unwrap().content,
        "[text][missing]"
    );
}

#[test]
fn test_collapsed_and_shortcut_references() {
    let doc = parse("[key][] and [key]\n\n[key]: target\n");
    let para = doc.children[0].as_paragraph().expect("paragraph");
    let links: Vec<_> = para
        .content
        .spans()
        .iter()
        .filter_map(|span| span.as_link())
        .collect();
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|link| link.target == "target"));
}

#[test]
fn test_reference_image() {
    let doc = parse("![alt][pic]\n\n[pic]: image.png \"Pic\"\n");
    let para = doc.children[0].as_paragraph().expect("paragraph");
    let Span::Image(image) = &para.content.spans()[0] else {
        panic!("expected image, got {:?}", para.content.spans()[0]);
    };
    assert_eq!(image.src, "image.png");
    assert_eq!(image.title, "Pic");
}

#[test]
fn test_definition_inside_quote_is_visible_to_whole_document() {
    let doc = parse("> [k]: inner\n\nuses [k]\n");
    let para = doc.children[1].as_paragraph().expect("paragraph");
    let link = para
        .content
        .spans()
        .iter()
        .find_map(|span| span.as_link())
        .expect("definition collected from quote interior");
    assert_eq!(link.target, "inner");
}

#[test]
fn test_escapes_stripped_from_target_and_title() {
    let doc = parse("[k]: tar\\_get \"ti\\*tle\"\n");
    let def = &doc.link_definitions["k"];
    assert_eq!(def.target, "tar_get");
    assert_eq!(def.title, "ti*tle");
}
