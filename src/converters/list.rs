//! Ordered and unordered lists

use crate::builder::MarkdownBuilder;
use crate::converters::inline::render_node;
use crate::converters::{LinkTracker, MAX_TRAVERSAL_DEPTH, tidy_inline};
use crate::dom::{Document, NodeId};

/// `ul`/`ol`
///
/// Only direct `li` children are items. An item's own line excludes nested
/// lists, which follow it one indent step deeper. Ordered lists always count
/// from 1. A list starting at indent 0 is surrounded by blank lines.
pub fn convert_list(
    doc: &Document,
    node: NodeId,
    builder: &mut MarkdownBuilder,
    tracker: &mut dyn LinkTracker,
) {
    let top_level = builder.indent_level() == 0;
    if top_level {
        builder.add_blank_line();
    }
    emit_items(doc, node, builder, tracker, 0);
    if top_level {
        builder.add_blank_line();
    }
}

fn emit_items(
    doc: &Document,
    list: NodeId,
    builder: &mut MarkdownBuilder,
    tracker: &mut dyn LinkTracker,
    depth: usize,
) {
    if depth > MAX_TRAVERSAL_DEPTH {
        return;
    }

    let ordered = doc.tag_name(list) == Some("ol");
    let items: Vec<NodeId> = doc
        .element_children(list)
        .filter(|child| doc.tag_name(*child) == Some("li"))
        .collect();

    for (index, item) in items.into_iter().enumerate() {
        let mut raw = String::new();
        let mut nested = Vec::new();
        for child in doc.children(item) {
            if doc.has_tag(child, &["ul", "ol"]) {
                nested.push(child);
            } else {
                render_node(doc, child, tracker, &mut raw, depth + 1);
            }
        }

        // Items are single lines; hard breaks become spaces
        let text = tidy_inline(&raw).replace('\n', " ");
        builder.add_list_item(&text, ordered, index + 1);

        for sublist in nested {
            builder.indent();
            emit_items(doc, sublist, builder, tracker, depth + 1);
            builder.outdent();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::NoTracking;
    use crate::parser::parse_fragment;

    fn convert(html: &str) -> String {
        let doc = parse_fragment(html).unwrap();
        let list = doc.query_selector(doc.root(), "ul, ol").unwrap();
        let mut builder = MarkdownBuilder::new();
        convert_list(&doc, list, &mut builder, &mut NoTracking);
        builder.build(true)
    }

    #[test]
    fn test_nested_unordered() {
        assert_eq!(
            convert("<ul><li>A</li><li>B<ul><li>C</li></ul></li></ul>"),
            "- A\n- B\n  - C"
        );
    }

    #[test]
    fn test_ordered_ignores_start() {
        assert_eq!(
            convert(r#"<ol start="5"><li value="9">one</li><li>two</li></ol>"#),
            "1. one\n2. two"
        );
    }

    #[test]
    fn test_mixed_nesting() {
        assert_eq!(
            convert("<ol><li>x<ul><li>y<ol><li>z</li></ol></li></ul></li></ol>"),
            "1. x\n  - y\n    1. z"
        );
    }

    #[test]
    fn test_item_inline_markup() {
        assert_eq!(
            convert(r#"<ul><li><strong>Key</strong> <a href="/k">docs</a></li></ul>"#),
            "- **Key** [docs](/k)"
        );
    }

    #[test]
    fn test_only_direct_items() {
        assert_eq!(
            convert("<ul><li>a</li><div><li>stray</li></div></ul>"),
            "- a"
        );
    }

    #[test]
    fn test_top_level_list_gets_blank_lines() {
        let doc = parse_fragment("<ul><li>a</li></ul>").unwrap();
        let list = doc.query_selector(doc.root(), "ul").unwrap();
        let mut builder = MarkdownBuilder::new();
        builder.add("before");
        convert_list(&doc, list, &mut builder, &mut NoTracking);
        builder.add("after");
        assert_eq!(builder.build(true), "before\n\n- a\n\nafter");
    }
}
