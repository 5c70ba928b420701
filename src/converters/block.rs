//! Headings, blockquotes, thematic breaks and text nodes

use crate::builder::MarkdownBuilder;
use crate::converters::inline::render_node;
use crate::converters::{
    LinkTracker, MAX_TRAVERSAL_DEPTH, collapse_whitespace, is_skipped_tag,
};
use crate::dom::{Document, NodeId, NodeKind};

/// `h1`..`h6`: full text content, whitespace collapsed
pub fn convert_heading(doc: &Document, node: NodeId, level: u8, builder: &mut MarkdownBuilder) {
    let text = collapse_whitespace(&doc.text_content(node));
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    builder.add_heading(level as usize, text);
}

/// Text node: emitted verbatim
pub fn convert_text(text: Option<&str>, builder: &mut MarkdownBuilder) {
    builder.add(text.unwrap_or(""));
}

/// `hr`: thematic break between blank lines
pub fn convert_rule(builder: &mut MarkdownBuilder) {
    builder.add_blank_line().add_line("---").add_blank_line();
}

/// Accumulates blockquote lines, separating paragraphs with an empty line
#[derive(Default)]
struct QuoteLines {
    lines: Vec<String>,
    current: String,
}

impl QuoteLines {
    fn flush(&mut self) {
        let line = collapse_whitespace(&self.current).trim().to_string();
        self.current.clear();
        if !line.is_empty() {
            self.lines.push(line);
        }
    }

    fn paragraph_break(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|line| !line.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn finish(mut self) -> String {
        self.flush();
        while self.lines.last().is_some_and(|line| line.is_empty()) {
            self.lines.pop();
        }
        self.lines.join("\n")
    }
}

/// `blockquote`: `p`/`div` break paragraphs, `br` breaks lines, inline
/// markup is preserved
pub fn convert_blockquote(
    doc: &Document,
    node: NodeId,
    builder: &mut MarkdownBuilder,
    tracker: &mut dyn LinkTracker,
) {
    let mut quote = QuoteLines::default();
    for child in doc.children(node) {
        collect_quote(doc, child, tracker, &mut quote, 1);
    }

    let text = quote.finish();
    if text.trim().is_empty() {
        return;
    }
    builder.add_blockquote(&text);
}

fn collect_quote(
    doc: &Document,
    node: NodeId,
    tracker: &mut dyn LinkTracker,
    quote: &mut QuoteLines,
    depth: usize,
) {
    if depth > MAX_TRAVERSAL_DEPTH {
        return;
    }

    let tag = match doc.kind(node) {
        NodeKind::Text(text) => {
            quote.current.push_str(text);
            return;
        }
        NodeKind::Element(tag) => tag,
        NodeKind::Document | NodeKind::Other => return,
    };

    match tag {
        "br" => quote.flush(),
        "p" | "div" | "blockquote" | "section" | "pre" | "ul" | "ol" | "li" | "h1" | "h2"
        | "h3" | "h4" | "h5" | "h6" => {
            quote.paragraph_break();
            for child in doc.children(node) {
                collect_quote(doc, child, tracker, quote, depth + 1);
            }
            quote.paragraph_break();
        }
        "strong" | "b" | "em" | "i" | "code" | "a" | "img" => {
            render_node(doc, node, tracker, &mut quote.current, depth);
        }
        tag if is_skipped_tag(tag) => {}
        _ => {
            for child in doc.children(node) {
                collect_quote(doc, child, tracker, quote, depth + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::NoTracking;
    use crate::parser::parse_fragment;

    fn convert_first(html: &str, selector: &str) -> String {
        let doc = parse_fragment(html).unwrap();
        let node = doc.query_selector(doc.root(), selector).unwrap();
        let mut builder = MarkdownBuilder::new();
        match doc.tag_name(node) {
            Some("blockquote") => convert_blockquote(&doc, node, &mut builder, &mut NoTracking),
            Some(tag) => {
                let level = tag[1..].parse().unwrap();
                convert_heading(&doc, node, level, &mut builder)
            }
            None => unreachable!(),
        }
        builder.build(true)
    }

    #[test]
    fn test_heading_uses_full_text() {
        assert_eq!(
            convert_first("<h2>Getting <em>started</em>\n now</h2>", "h2"),
            "## Getting started now"
        );
    }

    #[test]
    fn test_empty_heading_emits_nothing() {
        assert_eq!(convert_first("<h3> <span></span> </h3>", "h3"), "");
    }

    #[test]
    fn test_blockquote_paragraphs() {
        assert_eq!(
            convert_first(
                "<blockquote><p>First <strong>bold</strong></p><p>Second<br>line</p></blockquote>",
                "blockquote"
            ),
            "> First **bold**\n>\n> Second\n> line"
        );
    }

    #[test]
    fn test_blockquote_plain_text() {
        assert_eq!(
            convert_first("<blockquote>  quoted   text </blockquote>", "blockquote"),
            "> quoted text"
        );
    }

    #[test]
    fn test_empty_blockquote_is_noop() {
        assert_eq!(convert_first("<blockquote> <p> </p></blockquote>", "blockquote"), "");
    }

    #[test]
    fn test_rule() {
        let mut builder = MarkdownBuilder::new();
        builder.add("a");
        convert_rule(&mut builder);
        builder.add("b");
        assert_eq!(builder.build(true), "a\n\n---\n\nb");
    }
}
