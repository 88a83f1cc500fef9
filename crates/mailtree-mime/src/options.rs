//! Parser configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default maximum length of a run of base64 characters between line breaks.
pub const DEFAULT_MAX_BASE64_LINE_LENGTH: usize = 76;

/// Default maximum length of one header line, excluding the CRLF (RFC 5322 2.1.1).
pub const DEFAULT_MAX_HEADER_LINE_LENGTH: usize = 998;

/// Options controlling how leniently a message is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParseOptions {
    /// Normalize bare CR or LF in quoted-printable bodies to CRLF instead of
    /// rejecting them.
    pub lenient_line_breaks: bool,

    /// A longer run of base64 characters without a line break is malformed.
    pub max_base64_line_length: usize,

    /// A longer header line is rejected.
    pub max_header_line_length: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            lenient_line_breaks: true,
            max_base64_line_length: DEFAULT_MAX_BASE64_LINE_LENGTH,
            max_header_line_length: DEFAULT_MAX_HEADER_LINE_LENGTH,
        }
    }
}

impl ParseOptions {
    /// Creates options with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether bare line breaks are tolerated in quoted-printable bodies.
    #[must_use]
    pub const fn lenient_line_breaks(mut self, lenient: bool) -> Self {
        self.lenient_line_breaks = lenient;
        self
    }

    /// Sets the base64 line-length limit.
    #[must_use]
    pub const fn max_base64_line_length(mut self, max: usize) -> Self {
        self.max_base64_line_length = max;
        self
    }

    /// Sets the header line-length limit.
    #[must_use]
    pub const fn max_header_line_length(mut self, max: usize) -> Self {
        self.max_header_line_length = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::new();
        assert!(options.lenient_line_breaks);
        assert_eq!(options.max_base64_line_length, 76);
        assert_eq!(options.max_header_line_length, 998);
    }

    #[test]
    fn test_builder() {
        let options = ParseOptions::new()
            .lenient_line_breaks(false)
            .max_base64_line_length(1000);
        assert!(!options.lenient_line_breaks);
        assert_eq!(options.max_base64_line_length, 1000);
        assert_eq!(options.max_header_line_length, 998);
    }
}
