//! Security validation and sanitization for HTML input
//!
//! Untrusted HTML may carry script URLs, inline event handlers, NUL bytes
//! meant to confuse downstream C consumers, or pathological nesting meant to
//! exhaust the converter. The defenses here are pure functions over the arena
//! document:
//!
//! 1. **Input validation**: reject NUL bytes and oversized input before parsing
//! 2. **Structural validation**: reject element nesting deeper than a hard ceiling
//! 3. **Attribute sanitization**: drop `on*` event handlers
//! 4. **URL sanitization**: blank out `javascript:`, `data:` and similar schemes
//!
//! Dangerous URLs and attributes are neutralized silently. Only validation
//! failures surface as [`ConversionError::SecurityViolation`].
//!
//! html5ever is an HTML5 parser, not an XML parser, so external entities are
//! never resolved.

use crate::dom::{Document, NodeId};
use crate::error::{ConversionError, ThreatType};

/// Maximum element nesting depth accepted by [`SecurityValidator::check_nesting_depth`]
pub const MAX_NESTING_DEPTH: usize = 500;

/// Hard ceiling on raw input size (10 MiB)
pub const MAX_INPUT_SIZE: usize = 10 * 1024 * 1024;

/// URL schemes that are blanked out by [`sanitize_url`]
const DANGEROUS_URL_SCHEMES: &[&str] = &[
    "javascript:",       // Script execution
    "data:",             // Can contain executable content
    "vbscript:",         // Legacy IE scripting
    "file:",             // Local file access
    "about:",            // Browser internals
    "chrome:",           // Browser internals
    "chrome-extension:", // Extension pages
];

/// Attributes carrying URLs that are rewritten through [`sanitize_url`]
const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// Security validator for HTML input
///
/// # Examples
///
/// ```
/// use llm_markdown_converter::security::SecurityValidator;
///
/// let validator = SecurityValidator::new();
/// assert!(validator.validate_input("<p>fine</p>").is_ok());
/// assert!(validator.validate_input("bad\0input").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SecurityValidator {
    max_depth: usize,
    max_input_size: usize,
}

impl SecurityValidator {
    /// Create a validator with the default limits
    pub fn new() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
            max_input_size: MAX_INPUT_SIZE,
        }
    }

    /// Create a validator with a custom nesting ceiling
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::new()
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Check if an attribute is an event handler (`on` prefix, any case)
    ///
    /// ```
    /// use llm_markdown_converter::security::SecurityValidator;
    ///
    /// let validator = SecurityValidator::new();
    /// assert!(validator.is_event_handler("onclick"));
    /// assert!(validator.is_event_handler("ONLOAD"));
    /// assert!(!validator.is_event_handler("href"));
    /// ```
    pub fn is_event_handler(&self, attr_name: &str) -> bool {
        attr_name
            .get(..2)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
    }

    /// Check if a URL uses a dangerous scheme
    pub fn is_dangerous_url(&self, url: &str) -> bool {
        is_dangerous_url(url)
    }

    /// Sanitize a URL, returning an empty string when it must not be emitted
    pub fn sanitize_url(&self, url: &str) -> String {
        sanitize_url(url)
    }

    /// Strip event handlers from an element and rewrite its URL attributes
    ///
    /// URL attributes whose value sanitizes to an empty string are removed.
    pub fn sanitize_attributes(&self, doc: &mut Document, element: NodeId) {
        let names: Vec<String> = doc
            .attributes(element)
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect();

        for name in names {
            if self.is_event_handler(&name) {
                doc.remove_attribute(element, &name);
                continue;
            }

            if URL_ATTRIBUTES.iter().any(|a| name.eq_ignore_ascii_case(a)) {
                let Some(value) = doc.get_attribute(element, &name) else {
                    continue;
                };
                let safe = sanitize_url(value);
                if safe.is_empty() {
                    doc.remove_attribute(element, &name);
                } else {
                    doc.set_attribute(element, &name, safe);
                }
            }
        }
    }

    /// Validate raw input before parsing
    ///
    /// # Errors
    ///
    /// - `SecurityViolation(NullByteInjection)` if the input contains a NUL byte
    /// - `SecurityViolation(SizeLimit)` if the input exceeds 10 MiB
    pub fn validate_input(&self, html: &str) -> Result<(), ConversionError> {
        if let Some(offset) = html.bytes().position(|b| b == 0) {
            return Err(ConversionError::SecurityViolation {
                threat: ThreatType::NullByteInjection,
                message: format!("NUL byte at offset {offset}"),
            });
        }

        if html.len() > self.max_input_size {
            return Err(ConversionError::SecurityViolation {
                threat: ThreatType::SizeLimit,
                message: format!(
                    "input of {} bytes exceeds the {} byte ceiling",
                    html.len(),
                    self.max_input_size
                ),
            });
        }

        Ok(())
    }

    /// Reject subtrees nested deeper than the configured ceiling
    ///
    /// Depth counts element levels below `element`, starting at `start_depth`.
    /// The walk uses an explicit stack.
    ///
    /// # Errors
    ///
    /// Returns `SecurityViolation(ExcessiveNesting)` past the ceiling.
    pub fn check_nesting_depth(
        &self,
        doc: &Document,
        element: NodeId,
        start_depth: usize,
    ) -> Result<(), ConversionError> {
        let mut stack = vec![(element, start_depth)];

        while let Some((node, depth)) = stack.pop() {
            if depth > self.max_depth {
                return Err(ConversionError::SecurityViolation {
                    threat: ThreatType::ExcessiveNesting,
                    message: format!(
                        "HTML nesting depth {} exceeds maximum allowed depth {}",
                        depth, self.max_depth
                    ),
                });
            }
            stack.extend(doc.element_children(node).map(|child| (child, depth + 1)));
        }

        Ok(())
    }
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a URL uses a dangerous scheme
///
/// Leading whitespace and embedded tab/CR/LF characters are ignored, since
/// browsers strip them before resolving the scheme.
///
/// ```
/// use llm_markdown_converter::security::is_dangerous_url;
///
/// assert!(is_dangerous_url("javascript:alert('xss')"));
/// assert!(is_dangerous_url("  JaVa\tScript:alert(1)"));
/// assert!(!is_dangerous_url("https://example.com"));
/// assert!(!is_dangerous_url("/relative/path"));
/// ```
pub fn is_dangerous_url(url: &str) -> bool {
    let cleaned: String = url
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
        .collect::<String>()
        .to_ascii_lowercase();

    DANGEROUS_URL_SCHEMES
        .iter()
        .any(|scheme| cleaned.starts_with(scheme))
}

/// Sanitize a URL for emission into Markdown
///
/// Returns an empty string for dangerous schemes. Protocol-relative URLs are
/// upgraded to `https:`, and whitespace is percent-encoded so the URL cannot
/// break out of a Markdown link target.
///
/// ```
/// use llm_markdown_converter::security::sanitize_url;
///
/// assert_eq!(sanitize_url("javascript:alert(1)"), "");
/// assert_eq!(sanitize_url("//cdn.example.com/a.png"), "https://cdn.example.com/a.png");
/// assert_eq!(sanitize_url("/a b"), "/a%20b");
/// ```
pub fn sanitize_url(url: &str) -> String {
    if is_dangerous_url(url) {
        return String::new();
    }

    let trimmed = url.trim();
    let mut output = String::with_capacity(trimmed.len() + 8);
    if trimmed.starts_with("//") {
        output.push_str("https:");
    }

    for c in trimmed.chars() {
        match c {
            ' ' => output.push_str("%20"),
            '\t' => output.push_str("%09"),
            '\n' => output.push_str("%0A"),
            '\r' => output.push_str("%0D"),
            _ => output.push(c),
        }
    }

    output
}
