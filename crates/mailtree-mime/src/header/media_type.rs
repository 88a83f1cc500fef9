//! MIME media types and their parameters.

use std::collections::BTreeMap;
use std::fmt;

use super::grammar::{self, is_token_char};
use super::semantics::{unquote, without_cfws};
use crate::charset;
use crate::error::{Error, Result};
use crate::transform::MAX_BOUNDARY_LENGTH;

/// A media type such as `text/plain; charset=utf-8`.
///
/// Type, subtype and parameter names are lowercase. Parameter values are
/// unquoted, with RFC 2231 continuations joined and extended values decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaType {
    top_level: String,
    sub_type: String,
    parameters: BTreeMap<String, String>,
}

/// RFC 2231 section of a parameter split across several names.
struct Section {
    number: u32,
    extended: bool,
    value: String,
}

impl MediaType {
    /// Creates a media type without parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMediaType`] if either part is not a MIME
    /// token.
    pub fn new(top_level: &str, sub_type: &str) -> Result<Self> {
        let is_token = |s: &str| !s.is_empty() && s.chars().all(is_token_char);
        if !is_token(top_level) || !is_token(sub_type) {
            return Err(Error::InvalidMediaType(format!("{top_level}/{sub_type}")));
        }
        Ok(Self::known(top_level, sub_type))
    }

    fn known(top_level: &str, sub_type: &str) -> Self {
        Self {
            top_level: top_level.to_ascii_lowercase(),
            sub_type: sub_type.to_ascii_lowercase(),
            parameters: BTreeMap::new(),
        }
    }

    /// `text/plain; charset=us-ascii`, the type of a part without a
    /// `Content-Type` field.
    #[must_use]
    pub fn text_plain_ascii() -> Self {
        Self::known("text", "plain").with_parameter("charset", "us-ascii")
    }

    /// `text/plain; charset=utf-8`.
    #[must_use]
    pub fn text_plain_utf8() -> Self {
        Self::known("text", "plain").with_parameter("charset", "utf-8")
    }

    /// `text/html; charset=utf-8`.
    #[must_use]
    pub fn text_html_utf8() -> Self {
        Self::known("text", "html").with_parameter("charset", "utf-8")
    }

    /// `message/rfc822`, the default inside `multipart/digest`.
    #[must_use]
    pub fn message_rfc822() -> Self {
        Self::known("message", "rfc822")
    }

    /// `application/octet-stream`.
    #[must_use]
    pub fn application_octet_stream() -> Self {
        Self::known("application", "octet-stream")
    }

    /// `multipart/<sub_type>` without a boundary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMediaType`] if `sub_type` is not a token.
    pub fn multipart(sub_type: &str) -> Result<Self> {
        Self::new("multipart", sub_type)
    }

    /// Adds or replaces a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_parameter(name, value);
        self
    }

    /// Adds or replaces a parameter.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<String>) {
        self.parameters
            .insert(name.to_ascii_lowercase(), value.into());
    }

    /// Parses a `Content-Type` value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMediaType`] if `value` does not match the
    /// content-type grammar.
    pub fn parse(value: &str) -> Result<Self> {
        if !grammar::matches(value, grammar::content_type) {
            return Err(Error::InvalidMediaType(value.to_string()));
        }
        let (head, parameters) = split_parameters(value);
        let (top_level, sub_type) = head
            .split_once('/')
            .ok_or_else(|| Error::InvalidMediaType(value.to_string()))?;
        Ok(Self {
            top_level: top_level.to_ascii_lowercase(),
            sub_type: sub_type.to_ascii_lowercase(),
            parameters,
        })
    }

    /// Top-level type, such as `text`.
    #[must_use]
    pub fn top_level_type(&self) -> &str {
        &self.top_level
    }

    /// Subtype, such as `plain`.
    #[must_use]
    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    /// Whether this is `top_level/sub_type`, ignoring case.
    #[must_use]
    pub fn is(&self, top_level: &str, sub_type: &str) -> bool {
        self.top_level.eq_ignore_ascii_case(top_level)
            && self.sub_type.eq_ignore_ascii_case(sub_type)
    }

    /// A parameter by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Every parameter, sorted by name.
    #[must_use]
    pub const fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// The `charset` parameter.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// The `boundary` parameter.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Whether the top-level type is `multipart`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.top_level == "multipart"
    }

    /// Whether the top-level type is `text`.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.top_level == "text"
    }

    /// Whether the top-level type is `message`.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.top_level == "message"
    }
}

/// Splits `value` into its `type/subtype` head and decoded parameters.
///
/// Also used for `Content-Disposition`, whose head has no slash.
pub(crate) fn split_parameters(value: &str) -> (String, BTreeMap<String, String>) {
    let stripped = without_cfws(value);
    let mut pieces = split_outside_quotes(&stripped, ';').into_iter();
    let head = pieces.next().unwrap_or_default().to_string();

    let mut plain = BTreeMap::new();
    let mut sections: BTreeMap<String, Vec<Section>> = BTreeMap::new();
    for piece in pieces {
        let Some((name, raw)) = piece.split_once('=') else {
            continue;
        };
        let name = name.to_ascii_lowercase();
        let value = unquote(raw);
        match parse_section_name(&name) {
            Some((base, number, extended)) => {
                sections.entry(base.to_string()).or_default().push(Section {
                    number,
                    extended,
                    value,
                });
            }
            None => {
                plain.entry(name).or_insert(value);
            }
        }
    }

    for (name, mut parts) in sections {
        parts.sort_by_key(|s| s.number);
        plain.insert(name, join_sections(&parts));
    }
    (head, plain)
}

/// Splits on `sep` outside quoted strings.
fn split_outside_quotes(s: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut in_quote = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if in_quote && c == '\\' {
            escaped = true;
        } else if c == '"' {
            in_quote = !in_quote;
        } else if c == sep && !in_quote {
            pieces.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    pieces.push(&s[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

/// `name*N*`, `name*N` or `name*` to its base name, section number and
/// extended flag.
fn parse_section_name(name: &str) -> Option<(&str, u32, bool)> {
    let (name, extended) = match name.strip_suffix('*') {
        Some(rest) => (rest, true),
        None => (name, false),
    };
    match name.rsplit_once('*') {
        Some((base, number)) => Some((base, number.parse().ok()?, extended)),
        None if extended => Some((name, 0, true)),
        None => None,
    }
}

/// Joins RFC 2231 sections, decoding extended ones in the charset named by
/// the first section.
fn join_sections(sections: &[Section]) -> String {
    let mut charset_label = None;
    let mut bytes = Vec::new();
    for section in sections {
        if !section.extended {
            bytes.extend_from_slice(section.value.as_bytes());
            continue;
        }
        let mut encoded = section.value.as_str();
        if section.number == 0 {
            let mut fields = encoded.splitn(3, '\'');
            if let (Some(charset), Some(_language), Some(rest)) =
                (fields.next(), fields.next(), fields.next())
            {
                charset_label = Some(charset.to_string());
                encoded = rest;
            }
        }
        percent_decode(encoded, &mut bytes);
    }
    match charset_label.as_deref() {
        Some(label) if !label.is_empty() => charset::decode_lossy(label, &bytes),
        _ => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

fn percent_decode(s: &str, out: &mut Vec<u8>) {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok());
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
}

/// Writes one parameter, as a token, a quoted string or an RFC 2231
/// extended value.
pub(crate) fn write_parameter(f: &mut impl fmt::Write, name: &str, value: &str) -> fmt::Result {
    if !value.is_empty() && value.chars().all(is_token_char) {
        write!(f, "; {name}={value}")
    } else if value.chars().all(|c| c == ' ' || c.is_ascii_graphic()) {
        write!(f, "; {name}=")?;
        super::address::write_quoted(f, value)
    } else {
        write!(f, "; {name}*=utf-8''")?;
        for byte in value.bytes() {
            let c = char::from(byte);
            if byte.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~') {
                f.write_char(c)?;
            } else {
                write!(f, "%{byte:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.top_level, self.sub_type)?;
        for (name, value) in &self.parameters {
            write_parameter(f, name, value)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Whether `boundary` is usable as a multipart delimiter: 1 to 70
/// characters that do not end in a space.
#[must_use]
pub fn is_valid_boundary(boundary: &str) -> bool {
    !boundary.is_empty()
        && boundary.len() <= MAX_BOUNDARY_LENGTH
        && !boundary.ends_with(' ')
        && boundary.bytes().all(|b| b == b' ' || b.is_ascii_graphic())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let media_type = MediaType::parse("Text/Plain; Charset=UTF-8").unwrap();
        assert_eq!(media_type.top_level_type(), "text");
        assert_eq!(media_type.sub_type(), "plain");
        assert_eq!(media_type.charset(), Some("UTF-8"));
        assert!(media_type.is_text());
        assert!(media_type.is("TEXT", "plain"));
    }

    #[test]
    fn test_parse_quoted_and_comments() {
        let media_type =
            MediaType::parse("multipart/mixed (comment); boundary=\"----=_Part 123\"").unwrap();
        assert!(media_type.is_multipart());
        assert_eq!(media_type.boundary(), Some("----=_Part 123"));
    }

    #[test]
    fn test_parse_unquoted_tspecials() {
        let media_type = MediaType::parse("multipart/alternative; boundary=----=_Part_0").unwrap();
        assert_eq!(media_type.boundary(), Some("----=_Part_0"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(MediaType::parse("text").is_err());
        assert!(MediaType::parse("text/").is_err());
        assert!(MediaType::parse("text/plain; charset=\"open").is_err());
    }

    #[test]
    fn test_rfc2231_continuations() {
        let media_type = MediaType::parse(
            "application/x-stuff; title*0*=us-ascii'en'This%20is%20even%20more%20; \
             title*1*=%2A%2A%2Afun%2A%2A%2A%20; title*2=\"isn't it!\"",
        )
        .unwrap();
        assert_eq!(
            media_type.parameter("title"),
            Some("This is even more ***fun*** isn't it!")
        );
    }

    #[test]
    fn test_rfc2231_extended_charset() {
        let media_type =
            MediaType::parse("application/octet-stream; name*=iso-8859-1''caf%E9.txt").unwrap();
        assert_eq!(media_type.parameter("name"), Some("café.txt"));
    }

    #[test]
    fn test_display_quotes_and_encodes() {
        let media_type = MediaType::new("Application", "octet-stream")
            .unwrap()
            .with_parameter("name", "my file.txt")
            .with_parameter("title", "café");
        assert_eq!(
            media_type.to_string(),
            "application/octet-stream; name=\"my file.txt\"; title*=utf-8''caf%C3%A9"
        );
        let reparsed = MediaType::parse(&media_type.to_string()).unwrap();
        assert_eq!(reparsed, media_type);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            MediaType::text_plain_ascii().to_string(),
            "text/plain; charset=us-ascii"
        );
        assert_eq!(MediaType::message_rfc822().to_string(), "message/rfc822");
        assert!(MediaType::new("text", "pl ain").is_err());
    }

    #[test]
    fn test_boundary_validity() {
        assert!(is_valid_boundary("simple boundary"));
        assert!(!is_valid_boundary(""));
        assert!(!is_valid_boundary("ends with space "));
        assert!(!is_valid_boundary(&"x".repeat(71)));
        assert!(is_valid_boundary(&"x".repeat(70)));
    }
}
