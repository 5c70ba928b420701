//! Best-effort document metadata extraction
//!
//! Each field is resolved through a fixed priority chain of selectors,
//! stopping at the first non-empty value:
//!
//! - Title: `<title>` > `og:title` > `twitter:title` > first `<h1>`
//! - Description: `meta[name=description]` > `og:description` > `twitter:description`
//! - Author: `meta[name=author]` > `article:author` > `[itemprop=author]` > byline classes
//! - Publish date: `article:published_time` > `[itemprop=datePublished]` >
//!   `time[datetime]` > date classes, normalized to an ISO-8601 UTC timestamp
//! - Language: `html[lang]` > `meta[name=language]` > `og:locale`
//!
//! Extraction never fails; a field that cannot be found is `None`.
//!
//! # Examples
//!
//! ```rust
//! use llm_markdown_converter::metadata::MetadataExtractor;
//! use llm_markdown_converter::parser::parse_html;
//!
//! let doc = parse_html(r#"<html lang="en-GB"><head><title>Example</title></head></html>"#).unwrap();
//! let metadata = MetadataExtractor::new().extract(&doc);
//!
//! assert_eq!(metadata.title.as_deref(), Some("Example"));
//! assert_eq!(metadata.language.as_deref(), Some("en"));
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::converters::collapse_whitespace;
use crate::dom::{Document, NodeId};

static AUTHOR_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:written\s+by|by|author:)\s*").expect("AUTHOR_PREFIX should compile")
});
static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("ISO_DATE should compile")
});
static US_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").expect("US_DATE should compile")
});
static EU_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})-(\d{1,2})-(\d{4})").expect("EU_DATE should compile")
});

const BYLINE_SELECTORS: &[&str] = &[
    "[rel=author]",
    ".author",
    ".byline",
    ".post-author",
    "[class*=author]",
    "[class*=byline]",
];

const DATE_CLASS_SELECTORS: &[&str] = &[
    ".published",
    ".post-date",
    ".entry-date",
    ".date",
    "[class*=publish]",
    "[class*=date]",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Document-level metadata
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    /// ISO-8601 UTC timestamp, e.g. `2024-03-01T00:00:00.000Z`
    pub publish_date: Option<String>,
    /// Primary language subtag, e.g. `en`
    pub language: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every field from `doc`
    pub fn extract(&self, doc: &Document) -> DocumentMetadata {
        DocumentMetadata {
            title: self.title(doc),
            description: self.description(doc),
            author: self.author(doc),
            publish_date: self.publish_date(doc),
            language: self.language(doc),
        }
    }

    fn title(&self, doc: &Document) -> Option<String> {
        text_of(doc, "title")
            .or_else(|| meta_content(doc, "og:title"))
            .or_else(|| meta_content(doc, "twitter:title"))
            .or_else(|| text_of(doc, "h1"))
    }

    fn description(&self, doc: &Document) -> Option<String> {
        meta_content(doc, "description")
            .or_else(|| meta_content(doc, "og:description"))
            .or_else(|| meta_content(doc, "twitter:description"))
    }

    fn author(&self, doc: &Document) -> Option<String> {
        let raw = meta_content(doc, "author")
            .or_else(|| meta_content(doc, "article:author"))
            .or_else(|| first_value(doc, "[itemprop=author]"))
            .or_else(|| {
                BYLINE_SELECTORS
                    .iter()
                    .find_map(|selector| first_value(doc, selector))
            })?;

        let stripped = AUTHOR_PREFIX.replace(&raw, "").trim().to_string();
        (!stripped.is_empty()).then_some(stripped)
    }

    fn publish_date(&self, doc: &Document) -> Option<String> {
        let mut candidates: Vec<String> = Vec::new();
        candidates.extend(meta_content(doc, "article:published_time"));
        if let Some(node) = doc.query_selector(doc.root(), "[itemprop=datePublished]") {
            let value = attr_value(doc, node, "datetime")
                .or_else(|| attr_value(doc, node, "content"))
                .or_else(|| element_text(doc, node));
            candidates.extend(value);
        }
        if let Some(node) = doc.query_selector(doc.root(), "time[datetime]") {
            candidates.extend(attr_value(doc, node, "datetime"));
        }
        for selector in DATE_CLASS_SELECTORS {
            candidates.extend(first_value(doc, selector));
        }

        candidates.iter().find_map(|raw| normalize_date(raw))
    }

    fn language(&self, doc: &Document) -> Option<String> {
        let from_html = doc
            .document_element()
            .and_then(|html| attr_value(doc, html, "lang"))
            .and_then(|lang| primary_subtag(&lang, '-'));

        from_html
            .or_else(|| meta_content(doc, "language").and_then(|l| primary_subtag(&l, '-')))
            .or_else(|| meta_content(doc, "og:locale").and_then(|l| primary_subtag(&l, '_')))
    }
}

fn primary_subtag(value: &str, separator: char) -> Option<String> {
    let first = value.split(separator).next()?.trim().to_ascii_lowercase();
    (!first.is_empty()).then_some(first)
}

fn non_empty(value: &str) -> Option<String> {
    let cleaned = collapse_whitespace(value).trim().to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn attr_value(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    doc.get_attribute(node, name).and_then(non_empty)
}

fn element_text(doc: &Document, node: NodeId) -> Option<String> {
    non_empty(&doc.text_content(node))
}

/// `content` for `meta` elements, text for everything else
fn element_value(doc: &Document, node: NodeId) -> Option<String> {
    if doc.tag_name(node) == Some("meta") {
        attr_value(doc, node, "content")
    } else {
        element_text(doc, node)
    }
}

fn first_value(doc: &Document, selector: &str) -> Option<String> {
    doc.query_selector_all(doc.root(), selector)
        .into_iter()
        .find_map(|node| element_value(doc, node))
}

fn text_of(doc: &Document, selector: &str) -> Option<String> {
    doc.query_selector_all(doc.root(), selector)
        .into_iter()
        .find_map(|node| element_text(doc, node))
}

/// `content` of `<meta name=key>` or `<meta property=key>`
fn meta_content(doc: &Document, key: &str) -> Option<String> {
    let selector = format!("meta[name=\"{key}\"], meta[property=\"{key}\"]");
    doc.query_selector_all(doc.root(), &selector)
        .into_iter()
        .find_map(|node| attr_value(doc, node, "content"))
}

fn format_utc(datetime: NaiveDateTime) -> String {
    datetime
        .and_utc()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn midnight(date: NaiveDate) -> Option<String> {
    date.and_hms_opt(0, 0, 0).map(format_utc)
}

fn date_from_parts(year: &str, month: &str, day: &str) -> Option<String> {
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    midnight(date)
}

/// Normalize a free-form date to `YYYY-MM-DDTHH:MM:SS.mmmZ`
///
/// Structured formats (RFC 3339, RFC 2822 and common naive layouts) are tried
/// first, then `YYYY-MM-DD`, `MM/DD/YYYY` and `DD-MM-YYYY` anywhere in the
/// text. Returns `None` when nothing parses.
///
/// ```
/// use llm_markdown_converter::metadata::normalize_date;
///
/// assert_eq!(
///     normalize_date("2024-03-01T10:30:00+02:00").as_deref(),
///     Some("2024-03-01T08:30:00.000Z")
/// );
/// assert_eq!(normalize_date("03/15/2023").as_deref(), Some("2023-03-15T00:00:00.000Z"));
/// assert_eq!(normalize_date("sometime soon"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(format_utc(parsed.with_timezone(&Utc).naive_utc()));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(format_utc(parsed.with_timezone(&Utc).naive_utc()));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(format_utc(parsed));
        }
    }
    for format in NAIVE_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return midnight(parsed);
        }
    }

    if let Some(caps) = ISO_DATE.captures(raw) {
        if let Some(date) = date_from_parts(&caps[1], &caps[2], &caps[3]) {
            return Some(date);
        }
    }
    if let Some(caps) = US_DATE.captures(raw) {
        if let Some(date) = date_from_parts(&caps[3], &caps[1], &caps[2]) {
            return Some(date);
        }
    }
    if let Some(caps) = EU_DATE.captures(raw) {
        if let Some(date) = date_from_parts(&caps[3], &caps[2], &caps[1]) {
            return Some(date);
        }
    }

    None
}
