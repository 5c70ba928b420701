//! Conversion engine - walks the document tree and emits Markdown
//!
//! The engine ties the other modules together:
//!
//! 1. **Input checks**: string input is size-checked against
//!    [`ConversionOptions::max_input_size`] and validated by the
//!    [`SecurityValidator`] before any parsing happens
//! 2. **Parsing**: full documents (`<!DOCTYPE`/`<html>`) are parsed as-is,
//!    anything else is treated as a body fragment
//! 3. **Structure optimization**: unless the level is
//!    [`OptimizationLevel::Minimal`], the [`StructureOptimizer`] rewrites the
//!    subtree once before traversal
//! 4. **Traversal**: an explicit stack of frames, never recursion. Each
//!    element is classified into an [`ElementCategory`] and dispatched to a
//!    converter that either owns its subtree or lets the walk descend
//! 5. **Normalization**: the built Markdown goes through the three text
//!    normalizer passes (again skipped for `Minimal`)
//!
//! # Timeouts
//!
//! The timeout is cooperative. [`ConversionContext`] counts processed nodes
//! and compares the elapsed time against the budget every
//! [`TIMEOUT_CHECK_INTERVAL`] nodes, so a conversion can overrun its budget by
//! the time it takes to process that many nodes. Partial output is discarded.
//!
//! # Depth limits
//!
//! Two independent ceilings apply. [`SecurityValidator::check_nesting_depth`]
//! rejects documents nested deeper than 500 levels outright. During the walk,
//! frames deeper than [`MAX_TRAVERSAL_DEPTH`] are dropped without being
//! processed.
//!
//! # Examples
//!
//! ```rust
//! use llm_markdown_converter::converter::MarkdownConverter;
//!
//! let converter = MarkdownConverter::new();
//! let result = converter
//!     .convert("<h1>Title</h1><p>Hello <strong>world</strong>.</p>")
//!     .unwrap();
//!
//! assert_eq!(result.markdown, "# Title\n\nHello **world**.");
//! assert!(result.metadata.is_none());
//! ```

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::builder::MarkdownBuilder;
use crate::converters::LinkTracker;
use crate::converters::block::{convert_blockquote, convert_heading, convert_rule, convert_text};
use crate::converters::code::{convert_code, convert_pre};
use crate::converters::inline::{convert_emphasis, convert_image, convert_link, convert_paragraph};
use crate::converters::list::convert_list;
use crate::converters::table::{MAX_PIPE_TABLE_COLUMNS, convert_table, convert_table_as_list};
use crate::converters::{MAX_TRAVERSAL_DEPTH, is_inline_tag, is_skipped_tag};
use crate::dom::{Document, NodeId, NodeKind};
use crate::error::ConversionError;
use crate::metadata::{DocumentMetadata, MetadataExtractor};
use crate::normalizer::{fix_common_issues, normalize_unicode, normalize_whitespace};
use crate::optimizer::{OptimizerConfig, StructureOptimizer};
use crate::parser::{is_full_document, parse_fragment, parse_html};
use crate::security::{MAX_INPUT_SIZE, SecurityValidator};

/// Nodes processed between two timeout checks
pub const TIMEOUT_CHECK_INTERVAL: usize = 1000;

/// Tables with more rows than this are emitted as lists
pub const MAX_PIPE_TABLE_ROWS: usize = 20;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_WORDS_PER_MINUTE: usize = 200;

const BLOCK_CONTAINER_TAGS: &[&str] = &[
    "div", "section", "article", "main", "aside", "header", "footer", "nav", "figure",
    "figcaption", "details", "summary", "dl", "dt", "dd", "address",
];

const INLINE_PASSTHROUGH_TAGS: &[&str] = &["span", "mark", "del", "ins", "sub", "sup"];

/// Gates the optimizer and the text normalizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    /// Plain conversion: no DOM rewriting, no text normalization
    Minimal,
    #[default]
    Standard,
    /// Currently identical to `Standard`
    Aggressive,
}

impl OptimizationLevel {
    pub fn is_enabled(self) -> bool {
        self != OptimizationLevel::Minimal
    }
}

/// Individually switchable optimizations, all on by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizationFlags {
    pub normalize_headings: bool,
    pub flatten_deep_nesting: bool,
    pub remove_redundant_formatting: bool,
    pub merge_adjacent_elements: bool,
    /// Emit long or wide tables as label/value lists
    pub simplify_tables: bool,
    /// Render repeated URLs as plain text after their first link
    pub deduplicate_links: bool,
}

impl Default for OptimizationFlags {
    fn default() -> Self {
        Self {
            normalize_headings: true,
            flatten_deep_nesting: true,
            remove_redundant_formatting: true,
            merge_adjacent_elements: true,
            simplify_tables: true,
            deduplicate_links: true,
        }
    }
}

/// Conversion options
///
/// Field names serialize in camelCase and every field has a default, so a
/// partial JSON object is a valid configuration:
///
/// ```rust
/// use llm_markdown_converter::converter::{ConversionOptions, OptimizationLevel};
///
/// let options: ConversionOptions =
///     serde_json::from_str(r#"{"timeout": 500, "optimizationLevel": "minimal"}"#).unwrap();
/// assert_eq!(options.timeout_ms, 500);
/// assert_eq!(options.optimization_level, OptimizationLevel::Minimal);
/// assert!(options.optimizations.deduplicate_links);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionOptions {
    /// Attach a [`ConversionMetadata`] record to the result
    pub include_metadata: bool,
    /// Wall-clock budget in milliseconds; `0` disables it
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    /// Largest accepted string input in bytes
    pub max_input_size: usize,
    pub optimization_level: OptimizationLevel,
    pub optimizations: OptimizationFlags,
    /// Reading speed used for `reading_time`
    pub words_per_minute: usize,
    /// List and container nesting the optimizer keeps
    pub max_nesting_depth: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            include_metadata: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_input_size: MAX_INPUT_SIZE,
            optimization_level: OptimizationLevel::default(),
            optimizations: OptimizationFlags::default(),
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            max_nesting_depth: 3,
        }
    }
}

impl ConversionOptions {
    fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            max_nesting_depth: self.max_nesting_depth,
            normalize_headings: self.optimizations.normalize_headings,
            remove_redundant_formatting: self.optimizations.remove_redundant_formatting,
            flatten_deep_nesting: self.optimizations.flatten_deep_nesting,
            merge_adjacent_elements: self.optimizations.merge_adjacent_elements,
        }
    }
}

/// Per-call conversion state
///
/// Holds the timeout budget, the processed-node counter, the set of URLs
/// already emitted as links, and the running link and image counts. A fresh
/// context is created for every [`MarkdownConverter::convert`] call, which is
/// what makes a shared converter safe to use from several threads.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use llm_markdown_converter::converter::ConversionContext;
///
/// // 5 second budget
/// let ctx = ConversionContext::new(Duration::from_secs(5));
/// assert!(ctx.check_timeout().is_ok());
///
/// // No budget at all
/// let unlimited = ConversionContext::new(Duration::ZERO);
/// assert!(unlimited.check_timeout().is_ok());
/// ```
#[derive(Debug)]
pub struct ConversionContext {
    start_time: Instant,
    timeout: Option<Duration>,
    node_count: usize,
    linked_urls: HashSet<String>,
    deduplicate_links: bool,
    link_count: usize,
    image_count: usize,
}

impl ConversionContext {
    /// Create a context; `Duration::ZERO` means no timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            timeout: (!timeout.is_zero()).then_some(timeout),
            node_count: 0,
            linked_urls: HashSet::new(),
            deduplicate_links: true,
            link_count: 0,
            image_count: 0,
        }
    }

    /// Enable or disable link de-duplication (on by default)
    pub fn with_link_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate_links = enabled;
        self
    }

    /// Check whether the budget has been exceeded
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Timeout`] once the elapsed time passes the
    /// budget.
    pub fn check_timeout(&self) -> Result<(), ConversionError> {
        if let Some(timeout) = self.timeout
            && self.start_time.elapsed() > timeout
        {
            return Err(ConversionError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        Ok(())
    }

    /// Count one processed node, checking the budget at every checkpoint
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use llm_markdown_converter::converter::ConversionContext;
    ///
    /// let mut ctx = ConversionContext::new(Duration::from_secs(5));
    /// for _ in 0..2500 {
    ///     ctx.increment_and_check()?;
    /// }
    /// assert_eq!(ctx.node_count(), 2500);
    /// # Ok::<(), llm_markdown_converter::error::ConversionError>(())
    /// ```
    pub fn increment_and_check(&mut self) -> Result<(), ConversionError> {
        self.node_count += 1;
        if self.node_count.is_multiple_of(TIMEOUT_CHECK_INTERVAL) {
            self.check_timeout()?;
        }
        Ok(())
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Links emitted with full `[text](url)` syntax
    pub fn link_count(&self) -> usize {
        self.link_count
    }

    /// Images emitted with `![alt](src)` syntax
    pub fn image_count(&self) -> usize {
        self.image_count
    }
}

impl LinkTracker for ConversionContext {
    fn track_link(&mut self, url: &str) -> bool {
        if self.deduplicate_links && !self.linked_urls.insert(url.to_string()) {
            return false;
        }
        self.link_count += 1;
        true
    }

    fn track_image(&mut self, _src: &str) {
        self.image_count += 1;
    }
}

/// How the walk treats an element, derived from its tag name alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCategory {
    Heading(u8),
    Paragraph,
    Link,
    Image,
    /// `code` outside of `pre`
    InlineCode,
    Preformatted,
    Blockquote,
    List,
    Table,
    LineBreak,
    ThematicBreak,
    /// `strong`, `b`, `em`, `i`
    Emphasis,
    /// Layout wrappers whose children are walked as blocks
    BlockContainer,
    /// Inline wrappers without Markdown syntax of their own
    InlinePassthrough,
    /// Dropped together with the whole subtree
    Skip,
    Unknown,
}

impl ElementCategory {
    /// Classify a lowercase tag name
    ///
    /// ```rust
    /// use llm_markdown_converter::converter::ElementCategory;
    ///
    /// assert_eq!(ElementCategory::classify("h3"), ElementCategory::Heading(3));
    /// assert_eq!(ElementCategory::classify("script"), ElementCategory::Skip);
    /// assert_eq!(ElementCategory::classify("custom-tag"), ElementCategory::Unknown);
    /// ```
    pub fn classify(tag: &str) -> Self {
        match tag {
            "h1" => ElementCategory::Heading(1),
            "h2" => ElementCategory::Heading(2),
            "h3" => ElementCategory::Heading(3),
            "h4" => ElementCategory::Heading(4),
            "h5" => ElementCategory::Heading(5),
            "h6" => ElementCategory::Heading(6),
            "p" => ElementCategory::Paragraph,
            "a" => ElementCategory::Link,
            "img" => ElementCategory::Image,
            "code" => ElementCategory::InlineCode,
            "pre" => ElementCategory::Preformatted,
            "blockquote" => ElementCategory::Blockquote,
            "ul" | "ol" => ElementCategory::List,
            "table" => ElementCategory::Table,
            "br" => ElementCategory::LineBreak,
            "hr" => ElementCategory::ThematicBreak,
            "strong" | "b" | "em" | "i" => ElementCategory::Emphasis,
            tag if is_skipped_tag(tag) => ElementCategory::Skip,
            tag if BLOCK_CONTAINER_TAGS.contains(&tag) => ElementCategory::BlockContainer,
            tag if INLINE_PASSTHROUGH_TAGS.contains(&tag) => ElementCategory::InlinePassthrough,
            _ => ElementCategory::Unknown,
        }
    }

    /// Whether the walk continues into the element's children
    pub fn descends(self) -> bool {
        matches!(
            self,
            ElementCategory::BlockContainer
                | ElementCategory::InlinePassthrough
                | ElementCategory::Unknown
        )
    }
}

/// What to convert
pub enum ConversionInput<'a> {
    /// Raw HTML, either a full document or a body fragment
    Html(&'a str),
    /// An already parsed document; the optimizer may rewrite it in place
    Document(&'a mut Document),
    /// A single element subtree; no document metadata is extracted
    Element {
        document: &'a mut Document,
        element: NodeId,
    },
}

impl<'a> From<&'a str> for ConversionInput<'a> {
    fn from(html: &'a str) -> Self {
        ConversionInput::Html(html)
    }
}

impl<'a> From<&'a String> for ConversionInput<'a> {
    fn from(html: &'a String) -> Self {
        ConversionInput::Html(html.as_str())
    }
}

impl<'a> From<&'a mut Document> for ConversionInput<'a> {
    fn from(document: &'a mut Document) -> Self {
        ConversionInput::Document(document)
    }
}

/// Statistics and document metadata for one conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub publish_date: Option<String>,
    pub language: Option<String>,
    pub word_count: usize,
    /// Minutes, rounded up
    pub reading_time: usize,
    /// Milliseconds, at least 1
    #[serde(rename = "conversionTime")]
    pub conversion_time_ms: u64,
    pub original_size: usize,
    pub output_size: usize,
    pub link_count: usize,
    pub image_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub markdown: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConversionMetadata>,
}

/// One pending node on the traversal stack
#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    depth: usize,
    parent: Option<NodeId>,
}

/// A resolved traversal root and what is known about where it came from
struct Target {
    root: NodeId,
    with_document_metadata: bool,
    original_size: usize,
}

/// HTML to Markdown converter
///
/// The converter itself holds only configuration, so one instance can be
/// shared freely; every call builds its own [`ConversionContext`].
#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    options: ConversionOptions,
    validator: SecurityValidator,
}

impl MarkdownConverter {
    /// Create a converter with default options
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConversionOptions) -> Self {
        Self {
            options,
            validator: SecurityValidator::new(),
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert HTML, a document or an element subtree to Markdown
    ///
    /// # Errors
    ///
    /// - [`ConversionError::SizeLimitExceeded`] for string input larger than
    ///   `max_input_size`
    /// - [`ConversionError::SecurityViolation`] for NUL bytes, input past the
    ///   hard size ceiling, or excessive nesting
    /// - [`ConversionError::Timeout`] when the walk exceeds the budget
    /// - [`ConversionError::InvalidHtml`] when no root element can be found
    pub fn convert<'a>(
        &self,
        input: impl Into<ConversionInput<'a>>,
    ) -> Result<ConversionResult, ConversionError> {
        let mut ctx = ConversionContext::new(Duration::from_millis(self.options.timeout_ms))
            .with_link_deduplication(self.options.optimizations.deduplicate_links);
        self.convert_with_context(input, &mut ctx)
    }

    /// Convert with a caller-supplied context
    ///
    /// The context's own timeout and de-duplication setting apply instead of
    /// the ones in the options.
    pub fn convert_with_context<'a>(
        &self,
        input: impl Into<ConversionInput<'a>>,
        ctx: &mut ConversionContext,
    ) -> Result<ConversionResult, ConversionError> {
        let result = self.run(input.into(), ctx);
        if let Err(
            err @ (ConversionError::Timeout { .. } | ConversionError::SecurityViolation { .. }),
        ) = &result
        {
            warn!(
                code = err.code(),
                nodes = ctx.node_count(),
                error = %err,
                "Conversion aborted"
            );
        }
        result
    }

    fn run(
        &self,
        input: ConversionInput<'_>,
        ctx: &mut ConversionContext,
    ) -> Result<ConversionResult, ConversionError> {
        let mut parsed: Document;
        let (doc, target) = match input {
            ConversionInput::Html(html) => {
                self.check_html(html)?;
                let full = is_full_document(html);
                debug!(input_size = html.len(), full_document = full, "Starting conversion");
                parsed = if full {
                    parse_html(html)?
                } else {
                    parse_fragment(html)?
                };
                let root = document_root(&parsed)?;
                let target = Target {
                    root,
                    with_document_metadata: full,
                    original_size: html.len(),
                };
                (&mut parsed, target)
            }
            ConversionInput::Document(document) => {
                let root = document_root(document)?;
                debug!(nodes = document.len(), "Starting conversion of parsed document");
                let target = Target {
                    root,
                    with_document_metadata: true,
                    original_size: document.text_content(root).len(),
                };
                (document, target)
            }
            ConversionInput::Element { document, element } => {
                if !document.is_element(element) {
                    return Err(ConversionError::InvalidHtml(format!(
                        "node {element:?} is not an element"
                    )));
                }
                debug!(nodes = document.len(), "Starting conversion of element subtree");
                let target = Target {
                    root: element,
                    with_document_metadata: false,
                    original_size: document.text_content(element).len(),
                };
                (document, target)
            }
        };

        self.convert_tree(doc, target, ctx)
    }

    fn check_html(&self, html: &str) -> Result<(), ConversionError> {
        if html.len() > self.options.max_input_size {
            return Err(ConversionError::SizeLimitExceeded {
                actual_size: html.len(),
                max_size: self.options.max_input_size,
            });
        }
        self.validator.validate_input(html)
    }

    fn convert_tree(
        &self,
        doc: &mut Document,
        target: Target,
        ctx: &mut ConversionContext,
    ) -> Result<ConversionResult, ConversionError> {
        self.validator.check_nesting_depth(doc, target.root, 0)?;

        let document_metadata = if self.options.include_metadata && target.with_document_metadata
        {
            MetadataExtractor::new().extract(doc)
        } else {
            DocumentMetadata::default()
        };

        let optimize = self.options.optimization_level.is_enabled();
        if optimize {
            StructureOptimizer::new(self.options.optimizer_config()).optimize(doc, target.root);
        }

        let mut builder = MarkdownBuilder::new();
        self.traverse(doc, target.root, &mut builder, ctx)?;

        let mut markdown = builder.build(true);
        if optimize {
            markdown = normalize_whitespace(&markdown);
            markdown = normalize_unicode(&markdown);
            markdown = fix_common_issues(&markdown);
        }

        debug!(
            nodes = ctx.node_count(),
            output_size = markdown.len(),
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            "Conversion finished"
        );

        let metadata = self
            .options
            .include_metadata
            .then(|| self.build_metadata(&markdown, document_metadata, target.original_size, ctx));

        Ok(ConversionResult { markdown, metadata })
    }

    fn build_metadata(
        &self,
        markdown: &str,
        document: DocumentMetadata,
        original_size: usize,
        ctx: &ConversionContext,
    ) -> ConversionMetadata {
        let word_count = markdown.split_whitespace().count();
        let words_per_minute = self.options.words_per_minute.max(1);
        let elapsed_ms = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX);

        ConversionMetadata {
            title: document.title,
            description: document.description,
            author: document.author,
            publish_date: document.publish_date,
            language: document.language,
            word_count,
            reading_time: word_count.div_ceil(words_per_minute),
            conversion_time_ms: elapsed_ms.max(1),
            original_size,
            output_size: markdown.len(),
            link_count: ctx.link_count(),
            image_count: ctx.image_count(),
        }
    }

    fn traverse(
        &self,
        doc: &mut Document,
        root: NodeId,
        builder: &mut MarkdownBuilder,
        ctx: &mut ConversionContext,
    ) -> Result<(), ConversionError> {
        let mut stack = vec![Frame {
            node: root,
            depth: 0,
            parent: None,
        }];

        while let Some(frame) = stack.pop() {
            ctx.increment_and_check()?;

            if frame.depth > MAX_TRAVERSAL_DEPTH {
                trace!(
                    node = ?frame.node,
                    parent = ?frame.parent,
                    depth = frame.depth,
                    "Dropping frame past traversal depth"
                );
                continue;
            }

            let category = match doc.kind(frame.node) {
                NodeKind::Text(text) => {
                    convert_text(Some(text), builder);
                    continue;
                }
                NodeKind::Document | NodeKind::Other => continue,
                NodeKind::Element(tag) => ElementCategory::classify(tag),
            };

            self.dispatch(doc, frame.node, category, builder, ctx);

            if category.descends() {
                stack.extend(doc.children(frame.node).iter().rev().map(|&child| Frame {
                    node: child,
                    depth: frame.depth + 1,
                    parent: Some(frame.node),
                }));
            }
        }

        Ok(())
    }

    fn dispatch(
        &self,
        doc: &mut Document,
        node: NodeId,
        category: ElementCategory,
        builder: &mut MarkdownBuilder,
        ctx: &mut ConversionContext,
    ) {
        match category {
            ElementCategory::Heading(level) => convert_heading(doc, node, level, builder),
            ElementCategory::Paragraph => convert_paragraph(doc, node, builder, ctx),
            ElementCategory::Link => {
                self.validator.sanitize_attributes(doc, node);
                convert_link(doc, node, builder, ctx);
            }
            ElementCategory::Image => {
                self.validator.sanitize_attributes(doc, node);
                convert_image(doc, node, builder, ctx);
            }
            ElementCategory::InlineCode => convert_code(doc, node, builder),
            ElementCategory::Preformatted => convert_pre(doc, node, builder),
            ElementCategory::Blockquote => convert_blockquote(doc, node, builder, ctx),
            ElementCategory::List => convert_list(doc, node, builder, ctx),
            ElementCategory::Table => {
                if self.options.optimizations.simplify_tables && is_large_table(doc, node) {
                    convert_table_as_list(doc, node, builder, ctx);
                } else {
                    convert_table(doc, node, builder, ctx);
                }
            }
            ElementCategory::LineBreak => {
                builder.new_line();
            }
            ElementCategory::ThematicBreak => convert_rule(builder),
            ElementCategory::Emphasis => convert_emphasis(doc, node, builder, ctx),
            ElementCategory::BlockContainer => {
                let has_block_child = doc
                    .element_children(node)
                    .any(|child| doc.tag_name(child).is_some_and(|tag| !is_inline_tag(tag)));
                if has_block_child {
                    builder.add_blank_line();
                } else if !builder.at_line_start() {
                    builder.new_line();
                }
            }
            ElementCategory::Skip => {
                trace!(node = ?node, tag = ?doc.tag_name(node), "Skipping subtree");
            }
            ElementCategory::InlinePassthrough | ElementCategory::Unknown => {}
        }
    }
}

/// `body`, falling back to the document element
fn document_root(doc: &Document) -> Result<NodeId, ConversionError> {
    doc.body()
        .or_else(|| doc.document_element())
        .ok_or_else(|| ConversionError::InvalidHtml("document has no root element".to_string()))
}

/// More than [`MAX_PIPE_TABLE_ROWS`] rows, or a first row wider than
/// [`MAX_PIPE_TABLE_COLUMNS`] cells
fn is_large_table(doc: &Document, table: NodeId) -> bool {
    let mut rows = doc
        .descendants(table)
        .filter(|node| doc.tag_name(*node) == Some("tr"));

    let Some(first_row) = rows.next() else {
        return false;
    };
    let first_row_cells = doc
        .element_children(first_row)
        .filter(|cell| doc.has_tag(*cell, &["td", "th"]))
        .count();
    if first_row_cells > MAX_PIPE_TABLE_COLUMNS {
        return true;
    }

    1 + rows.count() > MAX_PIPE_TABLE_ROWS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThreatType;

    fn convert(html: &str) -> String {
        MarkdownConverter::new().convert(html).unwrap().markdown
    }

    fn convert_minimal(html: &str) -> String {
        let options = ConversionOptions {
            optimization_level: OptimizationLevel::Minimal,
            ..Default::default()
        };
        MarkdownConverter::with_options(options)
            .convert(html)
            .unwrap()
            .markdown
    }

    fn table(columns: usize, rows: usize) -> String {
        let mut html = String::from("<table>");
        for r in 0..rows {
            html.push_str("<tr>");
            for c in 0..columns {
                html.push_str(&format!("<td>r{r}c{c}</td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
        html
    }

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(
            convert("<h1>Title</h1><p>Hello <strong>world</strong>.</p>"),
            "# Title\n\nHello **world**."
        );
    }

    #[test]
    fn test_full_document_uses_body() {
        let html = "<!DOCTYPE html><html><head><title>T</title><style>p{}</style></head>\
                    <body><p>Body text.</p></body></html>";
        assert_eq!(convert(html), "Body text.");
    }

    #[test]
    fn test_skipped_elements_drop_subtree() {
        let html = "<p>Keep.</p><script>alert(1)</script><form><p>Form text</p></form>";
        assert_eq!(convert(html), "Keep.");
    }

    #[test]
    fn test_nested_containers() {
        let html = "<div><h1>Section</h1><div><p>First.</p><p>Second.</p></div></div>";
        assert_eq!(convert(html), "# Section\n\nFirst.\n\nSecond.");
    }

    #[test]
    fn test_inline_only_container_starts_new_line() {
        assert_eq!(convert_minimal("<div>one</div><div>two</div>"), "one\ntwo");
    }

    #[test]
    fn test_unknown_and_passthrough_tags_descend() {
        assert_eq!(
            convert("<custom-el><span>inner <mark>text</mark></span></custom-el>"),
            "inner text"
        );
    }

    #[test]
    fn test_link_deduplication() {
        assert_eq!(
            convert(r#"<a href="http://x.com">one</a> <a href="http://x.com">two</a>"#),
            "[one](http://x.com) two"
        );
    }

    #[test]
    fn test_link_deduplication_can_be_disabled() {
        let mut options = ConversionOptions::default();
        options.optimizations.deduplicate_links = false;
        let result = MarkdownConverter::with_options(options)
            .convert(r#"<a href="http://x.com">one</a> <a href="http://x.com">two</a>"#)
            .unwrap();
        assert_eq!(result.markdown, "[one](http://x.com) [two](http://x.com)");
    }

    #[test]
    fn test_dedup_spans_paragraphs_and_standalone_links() {
        let html = r#"<p>See <a href="/docs">the docs</a>.</p><a href="/docs">docs again</a>"#;
        let output = convert(html);
        assert_eq!(output.matches("](/docs)").count(), 1);
        assert!(output.ends_with("docs again"));
    }

    #[test]
    fn test_dangerous_image_falls_back_to_alt() {
        assert_eq!(
            convert(r#"<img src="javascript:alert(1)" alt="pic">"#),
            "[Image: pic]"
        );
    }

    #[test]
    fn test_event_handlers_are_stripped_before_conversion() {
        let mut doc = crate::parser::parse_fragment(
            r#"<a href="/ok" onclick="steal()">ok</a>"#,
        )
        .unwrap();
        let result = MarkdownConverter::new().convert(&mut doc).unwrap();
        assert_eq!(result.markdown, "[ok](/ok)");
        let link = doc.query_selector(doc.root(), "a").unwrap();
        assert_eq!(doc.get_attribute(link, "onclick"), None);
    }

    #[test]
    fn test_code_block_language() {
        let output = convert(r#"<pre><code class="language-js">let x=1;</code></pre>"#);
        assert_eq!(output, "```javascript\nlet x=1;\n```");
    }

    #[test]
    fn test_wide_table_becomes_list() {
        let output = convert(&table(7, 2));
        assert!(output.starts_with("- Row 1:"));
        assert!(output.contains("Column 1: r0c0"));
        assert!(!output.contains('|'));
    }

    #[test]
    fn test_long_table_becomes_list() {
        let output = convert(&table(2, 21));
        assert!(output.starts_with("- Row 1:"));
        assert!(output.contains("- Row 21:"));
    }

    #[test]
    fn test_long_table_kept_without_simplification() {
        let mut options = ConversionOptions::default();
        options.optimizations.simplify_tables = false;
        let output = MarkdownConverter::with_options(options)
            .convert(table(2, 21).as_str())
            .unwrap()
            .markdown;
        assert!(output.starts_with("| r0c0 | r0c1 |"));
    }

    #[test]
    fn test_twenty_rows_stay_a_pipe_table() {
        assert!(convert(&table(2, 20)).starts_with('|'));
    }

    #[test]
    fn test_line_break_and_rule() {
        assert_eq!(convert_minimal("a<br>b<hr>c"), "a\nb\n\n---\n\nc");
    }

    #[test]
    fn test_heading_normalization_runs_by_default() {
        assert_eq!(
            convert("<h1>A</h1><h3>B</h3><h5>C</h5>"),
            "# A\n\n## B\n\n### C"
        );
    }

    #[test]
    fn test_minimal_level_skips_optimizer() {
        assert_eq!(
            convert_minimal("<h1>A</h1><h3>B</h3>"),
            "# A\n\n### B"
        );
    }

    #[test]
    fn test_size_limit_exceeded() {
        let options = ConversionOptions {
            max_input_size: 10,
            ..Default::default()
        };
        let err = MarkdownConverter::with_options(options)
            .convert("<p>eleven b</p>")
            .unwrap_err();
        match err {
            ConversionError::SizeLimitExceeded {
                actual_size,
                max_size,
            } => {
                assert_eq!(actual_size, 15);
                assert_eq!(max_size, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_null_byte_rejected() {
        let err = MarkdownConverter::new().convert("<p>a\0b</p>").unwrap_err();
        assert!(matches!(
            err,
            ConversionError::SecurityViolation {
                threat: ThreatType::NullByteInjection,
                ..
            }
        ));
    }

    #[test]
    fn test_excessive_nesting_rejected() {
        let html = format!("{}x{}", "<div>".repeat(600), "</div>".repeat(600));
        let err = MarkdownConverter::new().convert(html.as_str()).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::SecurityViolation {
                threat: ThreatType::ExcessiveNesting,
                ..
            }
        ));
    }

    #[test]
    fn test_traversal_depth_ceiling_drops_deep_content() {
        let html = format!(
            "<p>top.</p>{}deep{}",
            "<span>".repeat(120),
            "</span>".repeat(120)
        );
        assert_eq!(convert_minimal(&html), "top.");
    }

    #[test]
    fn test_converters_share_the_traversal_ceiling() {
        let html = format!(
            "<blockquote>top {}deep{}</blockquote>",
            "<span>".repeat(MAX_TRAVERSAL_DEPTH + 10),
            "</span>".repeat(MAX_TRAVERSAL_DEPTH + 10)
        );
        let output = convert_minimal(&html);
        assert!(output.starts_with("> top"));
        assert!(!output.contains("deep"));
    }

    #[test]
    fn test_element_input_has_no_document_metadata() {
        let mut doc = crate::parser::parse_html(
            "<html><head><title>Doc</title></head><body><section><p>Part.</p></section></body></html>",
        )
        .unwrap();
        let section = doc.query_selector(doc.root(), "section").unwrap();
        let options = ConversionOptions {
            include_metadata: true,
            ..Default::default()
        };
        let result = MarkdownConverter::with_options(options)
            .convert(ConversionInput::Element {
                document: &mut doc,
                element: section,
            })
            .unwrap();
        assert_eq!(result.markdown, "Part.");
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.title, None);
        assert_eq!(metadata.word_count, 1);
    }

    #[test]
    fn test_element_input_must_be_element() {
        let mut doc = crate::parser::parse_fragment("<p>text</p>").unwrap();
        let p = doc.query_selector(doc.root(), "p").unwrap();
        let text = doc.children(p)[0];
        let err = MarkdownConverter::new()
            .convert(ConversionInput::Element {
                document: &mut doc,
                element: text,
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_HTML");
    }

    #[test]
    fn test_metadata_counts() {
        let html = r#"<!DOCTYPE html><html lang="en"><head><title>Counts</title></head><body>
            <p><a href="/a">a</a> <a href="/b">b</a> <a href="/a">again</a></p>
            <img src="/x.png" alt="x"><img src="data:image/png;base64,AA" alt="y">
            </body></html>"#;
        let options = ConversionOptions {
            include_metadata: true,
            ..Default::default()
        };
        let result = MarkdownConverter::with_options(options).convert(html).unwrap();
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Counts"));
        assert_eq!(metadata.language.as_deref(), Some("en"));
        assert_eq!(metadata.link_count, 2);
        assert_eq!(metadata.image_count, 1);
        assert_eq!(metadata.original_size, html.len());
        assert_eq!(metadata.output_size, result.markdown.len());
        assert!(metadata.conversion_time_ms >= 1);
    }

    #[test]
    fn test_reading_time_rounds_up() {
        let words = vec!["word"; 201].join(" ");
        let options = ConversionOptions {
            include_metadata: true,
            ..Default::default()
        };
        let metadata = MarkdownConverter::with_options(options)
            .convert(format!("<p>{words}</p>").as_str())
            .unwrap()
            .metadata
            .unwrap();
        assert_eq!(metadata.word_count, 201);
        assert_eq!(metadata.reading_time, 2);
    }

    #[test]
    fn test_context_timeout() {
        let mut ctx = ConversionContext::new(Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(2));
        let html = "<div><span>a</span></div>".repeat(1000);
        let err = MarkdownConverter::new()
            .convert_with_context(html.as_str(), &mut ctx)
            .unwrap_err();
        assert_eq!(err.code(), "CONVERSION_TIMEOUT");
    }

    #[test]
    fn test_checkpoint_interval() {
        let mut ctx = ConversionContext::new(Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(2));
        for _ in 0..TIMEOUT_CHECK_INTERVAL - 1 {
            assert!(ctx.increment_and_check().is_ok());
        }
        assert!(ctx.increment_and_check().is_err());
    }

    #[test]
    fn test_classify() {
        assert_eq!(ElementCategory::classify("ol"), ElementCategory::List);
        assert_eq!(ElementCategory::classify("b"), ElementCategory::Emphasis);
        assert_eq!(ElementCategory::classify("nav"), ElementCategory::BlockContainer);
        assert_eq!(ElementCategory::classify("sup"), ElementCategory::InlinePassthrough);
        assert_eq!(ElementCategory::classify("iframe"), ElementCategory::Skip);
        assert!(ElementCategory::Unknown.descends());
        assert!(!ElementCategory::Table.descends());
    }

    #[test]
    fn test_converter_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MarkdownConverter>();
    }

    #[test]
    fn test_options_serde_defaults() {
        let options: ConversionOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ConversionOptions::default());
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["timeout"], 30000);
        assert_eq!(json["optimizationLevel"], "standard");
        assert_eq!(json["optimizations"]["simplifyTables"], true);
    }
}
