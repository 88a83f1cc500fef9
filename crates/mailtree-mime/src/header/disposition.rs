//! `Content-Disposition` values.

use std::collections::BTreeMap;
use std::fmt;

use super::grammar::{self, is_token_char};
use super::media_type::{split_parameters, write_parameter};
use crate::error::{Error, Result};
use crate::rfc2047::{EncodedWordContext, decode_encoded_words};

/// A disposition type (`inline`, `attachment`, ...) and its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentDisposition {
    kind: String,
    parameters: BTreeMap<String, String>,
}

impl ContentDisposition {
    /// Creates a disposition without parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if `kind` is not a MIME token.
    pub fn new(kind: &str) -> Result<Self> {
        if kind.is_empty() || !kind.chars().all(is_token_char) {
            return Err(Error::invalid_header(
                "content-disposition",
                format!("invalid disposition type: {kind}"),
            ));
        }
        Ok(Self {
            kind: kind.to_ascii_lowercase(),
            parameters: BTreeMap::new(),
        })
    }

    /// `attachment; filename=<name>`.
    #[must_use]
    pub fn attachment(filename: &str) -> Self {
        Self {
            kind: "attachment".to_string(),
            parameters: BTreeMap::new(),
        }
        .with_parameter("filename", filename)
    }

    /// Adds or replaces a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters
            .insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Parses a `Content-Disposition` value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the value does not match the
    /// grammar.
    pub fn parse(value: &str) -> Result<Self> {
        if !grammar::matches(value, grammar::content_disposition) {
            return Err(Error::invalid_header(
                "content-disposition",
                format!("invalid value: {value}"),
            ));
        }
        let (kind, parameters) = split_parameters(value);
        Ok(Self {
            kind: kind.to_ascii_lowercase(),
            parameters,
        })
    }

    /// The disposition type, lowercase.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether the type is `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// A parameter by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The suggested file name with encoded words decoded and any directory
    /// components removed.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let raw = self.parameter("filename")?;
        let decoded = decode_encoded_words(raw, EncodedWordContext::Unstructured);
        let name = decoded
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        for (name, value) in &self.parameters {
            write_parameter(f, name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let disposition =
            ContentDisposition::parse("Attachment; filename=\"report.pdf\"; size=1024").unwrap();
        assert!(disposition.is_attachment());
        assert_eq!(disposition.filename().as_deref(), Some("report.pdf"));
        assert_eq!(disposition.parameter("SIZE"), Some("1024"));
    }

    #[test]
    fn test_filename_strips_paths() {
        let disposition =
            ContentDisposition::parse("attachment; filename=\"C:\\\\tmp\\\\evil.exe\"").unwrap();
        assert_eq!(disposition.filename().as_deref(), Some("evil.exe"));

        let disposition = ContentDisposition::parse("attachment; filename=\"../../x.txt\"").unwrap();
        assert_eq!(disposition.filename().as_deref(), Some("x.txt"));

        let disposition = ContentDisposition::parse("attachment; filename=\"dir/\"").unwrap();
        assert_eq!(disposition.filename(), None);
    }

    #[test]
    fn test_filename_encodings() {
        let disposition =
            ContentDisposition::parse("attachment; filename*=utf-8''%C3%A9t%C3%A9.txt").unwrap();
        assert_eq!(disposition.filename().as_deref(), Some("été.txt"));

        let disposition =
            ContentDisposition::parse("attachment; filename=\"=?utf-8?b?w6l0w6kudHh0?=\"").unwrap();
        assert_eq!(disposition.filename().as_deref(), Some("été.txt"));
    }

    #[test]
    fn test_display_round_trip() {
        let disposition = ContentDisposition::attachment("résumé final.pdf");
        let text = disposition.to_string();
        assert!(text.starts_with("attachment; filename*=utf-8''r%C3%A9sum%C3%A9%20final.pdf"));
        assert_eq!(ContentDisposition::parse(&text).unwrap(), disposition);
    }

    #[test]
    fn test_invalid() {
        assert!(ContentDisposition::parse("; filename=x").is_err());
        assert!(ContentDisposition::new("at tach").is_err());
    }
}
