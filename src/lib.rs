//! LLM Markdown Converter - HTML to Markdown for language model consumption
//!
//! Converts HTML strings, parsed documents or single element subtrees into
//! compact, deterministic Markdown. Links and image sources are sanitized,
//! repeated links are collapsed to plain text, and oversized tables become
//! label/value lists.
//!
//! # Architecture
//!
//! The library is structured into several modules:
//! - `parser`: HTML5 parsing using html5ever into a scraper tree
//! - `dom`: mutable document tree with CSS selector queries
//! - `security`: input validation and URL/attribute sanitization
//! - `optimizer`: DOM rewriting before traversal (headings, nesting, merging)
//! - `converter`: the traversal engine, options and conversion context
//! - `converters`: per-tag Markdown emitters
//! - `builder`: the Markdown text accumulator
//! - `normalizer`: whitespace, Unicode and punctuation clean-up of the output
//! - `metadata`: title/description/author/date/language extraction
//!
//! # Example
//!
//! ```rust
//! use llm_markdown_converter::{ConversionOptions, convert};
//!
//! let result = convert("<ul><li>A</li><li>B<ul><li>C</li></ul></li></ul>", &ConversionOptions::default())?;
//! assert_eq!(result.markdown, "- A\n- B\n  - C");
//! # Ok::<(), llm_markdown_converter::ConversionError>(())
//! ```

pub mod builder;
pub mod converter;
pub mod converters;
pub mod dom;
pub mod error;
pub mod metadata;
pub mod normalizer;
pub mod optimizer;
pub mod parser;
pub mod security;

pub use builder::MarkdownBuilder;
pub use converter::{
    ConversionContext, ConversionInput, ConversionMetadata, ConversionOptions, ConversionResult,
    MarkdownConverter, OptimizationFlags, OptimizationLevel,
};
pub use dom::{Document, NodeId};
pub use error::{ConversionError, ThreatType};
pub use parser::parse_html;

/// Convert HTML, a parsed document or an element subtree with `options`
///
/// Shorthand for [`MarkdownConverter::with_options`] followed by
/// [`MarkdownConverter::convert`].
pub fn convert<'a>(
    input: impl Into<ConversionInput<'a>>,
    options: &ConversionOptions,
) -> Result<ConversionResult, ConversionError> {
    MarkdownConverter::with_options(options.clone()).convert(input)
}
