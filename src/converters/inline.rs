//! Inline markup: paragraphs, links, images and emphasis
//!
//! The inline renderer walks an element's children and produces a single
//! string of Markdown inline syntax. Paragraphs, list items, table cells and
//! blockquotes all share it, so links rendered in any of those places go
//! through the same [`LinkTracker`].

use crate::builder::MarkdownBuilder;
use crate::converters::code::inline_code_span;
use crate::converters::{
    LinkTracker, MAX_TRAVERSAL_DEPTH, collapse_whitespace, escape_brackets, is_inline_tag,
    is_skipped_tag, tidy_inline,
};
use crate::dom::{Document, NodeId, NodeKind};
use crate::security::sanitize_url;

/// Render all children of `node` as inline Markdown
pub fn render_children(
    doc: &Document,
    node: NodeId,
    tracker: &mut dyn LinkTracker,
    output: &mut String,
) {
    for child in doc.children(node) {
        render_node(doc, child, tracker, output, 0);
    }
}

/// Render one node as inline Markdown
pub fn render_node(
    doc: &Document,
    node: NodeId,
    tracker: &mut dyn LinkTracker,
    output: &mut String,
    depth: usize,
) {
    if depth > MAX_TRAVERSAL_DEPTH {
        return;
    }

    let tag = match doc.kind(node) {
        NodeKind::Text(text) => {
            output.push_str(&collapse_whitespace(text));
            return;
        }
        NodeKind::Element(tag) => tag,
        NodeKind::Document | NodeKind::Other => return,
    };

    match tag {
        "strong" | "b" => wrap_emphasis(doc, node, "**", tracker, output, depth),
        "em" | "i" => wrap_emphasis(doc, node, "_", tracker, output, depth),
        "code" => output.push_str(&inline_code_span(&doc.text_content(node))),
        "a" => output.push_str(&render_link(doc, node, tracker)),
        "img" => output.push_str(&render_image(doc, node, tracker)),
        "br" => output.push_str("  \n"),
        tag if is_skipped_tag(tag) => {}
        tag => {
            // Block content inside an inline context still needs word breaks
            let block = !is_inline_tag(tag);
            if block {
                output.push(' ');
            }
            for child in doc.children(node) {
                render_node(doc, child, tracker, output, depth + 1);
            }
            if block {
                output.push(' ');
            }
        }
    }
}

/// Render `node` to a tidy string: whitespace collapsed, lines trimmed
pub fn render_inline(doc: &Document, node: NodeId, tracker: &mut dyn LinkTracker) -> String {
    let mut raw = String::new();
    render_children(doc, node, tracker, &mut raw);
    tidy_inline(&raw)
}

fn wrap_emphasis(
    doc: &Document,
    node: NodeId,
    marker: &str,
    tracker: &mut dyn LinkTracker,
    output: &mut String,
    depth: usize,
) {
    let mut inner = String::new();
    for child in doc.children(node) {
        render_node(doc, child, tracker, &mut inner, depth + 1);
    }

    let trimmed = inner.trim();
    if trimmed.is_empty() {
        if !inner.is_empty() {
            output.push(' ');
        }
        return;
    }

    // Spaces at the edges stay outside the markers
    if inner.starts_with(char::is_whitespace) {
        output.push(' ');
    }
    output.push_str(marker);
    output.push_str(trimmed);
    output.push_str(marker);
    if inner.ends_with(char::is_whitespace) {
        output.push(' ');
    }
}

/// Render an `a` element
///
/// Without an `href`, with a dangerous `href`, or when the tracker declines
/// the URL, only the trimmed text is emitted. Link text has `[`/`]` escaped.
pub fn render_link(doc: &Document, node: NodeId, tracker: &mut dyn LinkTracker) -> String {
    let text = collapse_whitespace(&doc.text_content(node)).trim().to_string();
    if text.is_empty() {
        return String::new();
    }

    let Some(href) = doc.get_attribute(node, "href") else {
        return text;
    };

    let safe = sanitize_url(href);
    if safe.is_empty() || !tracker.track_link(&safe) {
        return text;
    }

    format!("[{}]({})", escape_brackets(&text), safe)
}

/// Render an `img` element
///
/// Falls back to `[Image: alt]` when the source is missing or unsafe, and to
/// nothing when there is no alt text either.
pub fn render_image(doc: &Document, node: NodeId, tracker: &mut dyn LinkTracker) -> String {
    let alt = doc.get_attribute(node, "alt").map(escape_brackets);
    let src = doc
        .get_attribute(node, "src")
        .map(sanitize_url)
        .unwrap_or_default();

    if src.is_empty() {
        return match alt {
            Some(alt) if !alt.trim().is_empty() => format!("[Image: {}]", alt.trim()),
            _ => String::new(),
        };
    }

    tracker.track_image(&src);
    let alt = alt.unwrap_or_default();
    match doc.get_attribute(node, "title") {
        Some(title) => format!("![{}]({} \"{}\")", alt, src, title.replace('"', "\\\"")),
        None => format!("![{alt}]({src})"),
    }
}

/// `p` element: inline-render the children and emit a wrapped paragraph
pub fn convert_paragraph(
    doc: &Document,
    node: NodeId,
    builder: &mut MarkdownBuilder,
    tracker: &mut dyn LinkTracker,
) {
    let text = render_inline(doc, node, tracker);
    builder.add_paragraph(&text);
}

/// Standalone `a` element
pub fn convert_link(
    doc: &Document,
    node: NodeId,
    builder: &mut MarkdownBuilder,
    tracker: &mut dyn LinkTracker,
) {
    builder.add(&render_link(doc, node, tracker));
}

/// Standalone `img` element
pub fn convert_image(
    doc: &Document,
    node: NodeId,
    builder: &mut MarkdownBuilder,
    tracker: &mut dyn LinkTracker,
) {
    builder.add(&render_image(doc, node, tracker));
}

/// Standalone `strong`/`b`/`em`/`i`: only inline children are rendered
pub fn convert_emphasis(
    doc: &Document,
    node: NodeId,
    builder: &mut MarkdownBuilder,
    tracker: &mut dyn LinkTracker,
) {
    let marker = match doc.tag_name(node) {
        Some("strong" | "b") => "**",
        _ => "_",
    };

    let mut inner = String::new();
    for child in doc.children(node) {
        let inline = match doc.tag_name(child) {
            Some(tag) => is_inline_tag(tag),
            None => true,
        };
        if inline {
            render_node(doc, child, tracker, &mut inner, 1);
        }
    }

    let inner = collapse_whitespace(&inner);
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        builder.add(&inner);
        return;
    }

    let mut output = String::new();
    if inner.starts_with(' ') {
        output.push(' ');
    }
    output.push_str(marker);
    output.push_str(trimmed);
    output.push_str(marker);
    if inner.ends_with(' ') {
        output.push(' ');
    }
    builder.add(&output);
}
