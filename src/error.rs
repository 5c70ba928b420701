//! Error types for conversion operations

use std::fmt;

/// Category of a detected security threat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatType {
    /// Input contained a NUL byte
    NullByteInjection,
    /// Input exceeded the hard size ceiling of the validator
    SizeLimit,
    /// Element nesting exceeded the structural depth ceiling
    ExcessiveNesting,
}

impl ThreatType {
    /// Stable machine-readable tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::NullByteInjection => "NULL_BYTE_INJECTION",
            ThreatType::SizeLimit => "SIZE_LIMIT",
            ThreatType::ExcessiveNesting => "EXCESSIVE_NESTING",
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during HTML to Markdown conversion
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The document could not be turned into a tree with a usable root
    #[error("Invalid HTML: {0}")]
    InvalidHtml(String),

    /// String input larger than the configured `max_input_size`
    #[error("Input size {actual_size} bytes exceeds maximum of {max_size} bytes")]
    SizeLimitExceeded { actual_size: usize, max_size: usize },

    /// Traversal ran past the configured wall-clock budget
    #[error("Conversion timeout exceeded ({timeout_ms} ms)")]
    Timeout { timeout_ms: u64 },

    /// Input rejected by the security validator
    #[error("Security violation ({threat}): {message}")]
    SecurityViolation { threat: ThreatType, message: String },
}

impl ConversionError {
    /// Stable error code for callers
    pub fn code(&self) -> &'static str {
        match self {
            ConversionError::InvalidHtml(_) => "INVALID_HTML",
            ConversionError::SizeLimitExceeded { .. } => "SIZE_LIMIT_EXCEEDED",
            ConversionError::Timeout { .. } => "CONVERSION_TIMEOUT",
            ConversionError::SecurityViolation { .. } => "SECURITY_VIOLATION",
        }
    }

    /// HTTP-equivalent status for the error category
    pub fn status_code(&self) -> u16 {
        match self {
            ConversionError::InvalidHtml(_) => 400,
            ConversionError::SizeLimitExceeded { .. } => 413,
            ConversionError::Timeout { .. } => 408,
            ConversionError::SecurityViolation { .. } => 400,
        }
    }
}
