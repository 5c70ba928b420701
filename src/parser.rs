//! HTML5 parser using html5ever
//!
//! Parsing is delegated to html5ever, which implements the WHATWG tree
//! construction algorithm and therefore never rejects input: unclosed tags,
//! misnested formatting and stray end tags are all repaired the way a browser
//! would repair them.
//!
//! The tree is built straight into a `scraper::Html` through its
//! `HtmlTreeSink`, so the [`Document`] the rest of the crate works on is the
//! parser's own output. Comments, doctypes and processing instructions are
//! detached afterwards; nothing downstream renders them.
//!
//! # Examples
//!
//! ```rust
//! use llm_markdown_converter::parser::parse_html;
//!
//! let doc = parse_html("<html><body><h1>Hello</h1></body></html>").unwrap();
//! let body = doc.body().unwrap();
//! assert_eq!(doc.text_content(body), "Hello");
//!
//! // Missing closing tags are repaired
//! let doc = parse_html("<p>one<p>two").unwrap();
//! assert_eq!(doc.element_children(doc.body().unwrap()).count(), 2);
//! ```

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use scraper::{Html, HtmlTreeSink};

use crate::dom::{Document, NodeId, NodeKind};
use crate::error::ConversionError;

/// Parse an HTML string into an arena [`Document`]
///
/// Comments, doctypes and processing instructions are dropped. Tag and
/// attribute names come out of html5ever already lowercased.
///
/// # Errors
///
/// Returns `ConversionError::InvalidHtml` when the parser produced no root
/// element at all. html5ever synthesizes `<html>` for any input, so this is
/// not expected in practice.
pub fn parse_html(html: &str) -> Result<Document, ConversionError> {
    let sink = HtmlTreeSink::new(Html::new_document());
    let parsed = parse_document(sink, Default::default()).one(html);
    let mut doc = Document::from(parsed);
    strip_non_content(&mut doc);

    if doc.document_element().is_none() {
        return Err(ConversionError::InvalidHtml(
            "parser produced no root element".to_string(),
        ));
    }

    Ok(doc)
}

/// Parse a fragment by wrapping it in a minimal document shell
///
/// The fragment's nodes end up as children of `<body>`.
pub fn parse_fragment(html: &str) -> Result<Document, ConversionError> {
    let mut wrapped = String::with_capacity(html.len() + 26);
    wrapped.push_str("<html><body>");
    wrapped.push_str(html);
    wrapped.push_str("</body></html>");
    parse_html(&wrapped)
}

/// True when `html` looks like a complete document rather than a fragment
///
/// A document starts (after leading whitespace, case-insensitively) with a
/// `<!doctype` declaration or an `<html` start tag.
pub fn is_full_document(html: &str) -> bool {
    let trimmed = html.trim_start();
    let head: String = trimmed
        .chars()
        .take(9)
        .collect::<String>()
        .to_ascii_lowercase();

    if head.starts_with("<!doctype") {
        return true;
    }
    if let Some(rest) = head.strip_prefix("<html") {
        return rest
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c.is_ascii_whitespace());
    }
    false
}

/// Detach comments, doctypes and processing instructions
fn strip_non_content(doc: &mut Document) {
    let stray: Vec<NodeId> = doc
        .descendants(doc.root())
        .filter(|node| doc.kind(*node) == NodeKind::Other)
        .collect();
    for node in stray {
        doc.detach(node);
    }
}
