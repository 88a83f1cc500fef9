//! Header fields: reading, storage, grammar and semantics.
//!
//! [`Headers`] keeps fields in the order received, with lowercase names and
//! unfolded values. The submodules parse values: [`grammar`] recognizes the
//! RFC 5322 and MIME productions and records token spans through
//! [`tokener`], [`semantics`] turns those spans into values, and [`field`]
//! picks the grammar for each field name.

pub mod address;
pub mod date;
pub mod disposition;
pub mod field;
pub mod grammar;
pub mod media_type;
pub mod semantics;
pub mod tokener;

use std::fmt;

use crate::error::{Error, Result};
use crate::options::ParseOptions;
use crate::transform::Transform;

/// Column at which generated fields are folded.
pub const FOLD_WIDTH: usize = 78;

/// Ordered collection of header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a field, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Number of occurrences of a field.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.fields
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .count()
    }

    /// Appends a field.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        self.fields.push((name.to_ascii_lowercase(), value.into()));
    }

    /// Replaces the first occurrence of a field and drops the others, or
    /// appends the field if absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        match self.fields.iter().position(|(n, _)| *n == name) {
            Some(index) => {
                self.fields[index].1 = value.into();
                let mut seen = 0;
                self.fields.retain(|(n, _)| {
                    if *n == name {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.fields.push((name, value.into())),
        }
    }

    /// Removes every occurrence of a field. Returns whether any existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.fields.len() != before
    }

    /// Fields in order as `(name, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Reads a header block up to and including the blank line that ends
    /// it, or to end of stream.
    ///
    /// Continuation lines are unfolded. Lines must end in CRLF. A value that
    /// is not UTF-8 is rejected for structured fields and decoded lossily for
    /// unstructured ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] for a bare CR or LF, a line longer
    /// than the configured limit, a line without a field name, or a
    /// structured value that is not UTF-8.
    pub fn read<T: Transform + ?Sized>(source: &mut T, options: &ParseOptions) -> Result<Self> {
        let mut headers = Self::new();
        let mut current: Option<(String, Vec<u8>)> = None;

        while let Some(line) = read_line(source, options.max_header_line_length)? {
            if line.is_empty() {
                break;
            }
            if matches!(line[0], b' ' | b'\t') {
                let Some((_, value)) = current.as_mut() else {
                    return Err(Error::invalid_header("", "continuation line before any field"));
                };
                value.extend_from_slice(&line);
                continue;
            }
            if let Some((name, value)) = current.take() {
                headers.push_raw(name, &value)?;
            }
            current = Some(split_field(&line)?);
        }
        if let Some((name, value)) = current {
            headers.push_raw(name, &value)?;
        }
        Ok(headers)
    }

    fn push_raw(&mut self, name: String, raw: &[u8]) -> Result<()> {
        let value = match std::str::from_utf8(raw) {
            Ok(value) => value.to_string(),
            Err(_) if field::is_structured(&name) => {
                return Err(Error::invalid_header(&name, "value is not valid UTF-8"));
            }
            Err(_) => {
                tracing::debug!(field = %name, "Replacing undecodable bytes in header value");
                String::from_utf8_lossy(raw).into_owned()
            }
        };
        let value = value.trim_matches(|c: char| c == ' ' || c == '\t').to_string();
        self.fields.push((name, value));
        Ok(())
    }
}

/// Reads one line without its CRLF. Returns `None` at end of stream.
fn read_line<T: Transform + ?Sized>(source: &mut T, max: usize) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    loop {
        match source.read_byte()? {
            None if line.is_empty() => return Ok(None),
            None => return Ok(Some(line)),
            Some(b'\r') => {
                return match source.read_byte()? {
                    Some(b'\n') => Ok(Some(line)),
                    _ => Err(Error::invalid_header("", "bare CR in header block")),
                };
            }
            Some(b'\n') => return Err(Error::invalid_header("", "bare LF in header block")),
            Some(byte) => {
                line.push(byte);
                if line.len() > max {
                    return Err(Error::invalid_header(
                        "",
                        format!("header line longer than {max} bytes"),
                    ));
                }
            }
        }
    }
}

/// Splits a field line at its colon into a lowercase name and raw value.
fn split_field(line: &[u8]) -> Result<(String, Vec<u8>)> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| Error::invalid_header("", "line without a field name"))?;
    // Obsolete syntax allows white space before the colon.
    let name = line[..colon].trim_ascii_end();
    if name.is_empty() || !name.iter().all(|&b| (33..=126).contains(&b)) {
        return Err(Error::invalid_header(
            &String::from_utf8_lossy(name),
            "invalid field name",
        ));
    }
    let name = String::from_utf8_lossy(name).to_ascii_lowercase();
    Ok((name, line[colon + 1..].to_vec()))
}

/// Conventional capitalization of a field name.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    match name.to_ascii_lowercase().as_str() {
        "mime-version" => "MIME-Version".to_string(),
        "message-id" => "Message-ID".to_string(),
        "content-id" => "Content-ID".to_string(),
        "content-md5" => "Content-MD5".to_string(),
        "resent-message-id" => "Resent-Message-ID".to_string(),
        "dkim-signature" => "DKIM-Signature".to_string(),
        lower => lower
            .split('-')
            .map(|part| {
                let mut chars = part.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_ascii_uppercase().to_string() + chars.as_str()
                })
            })
            .collect::<Vec<_>>()
            .join("-"),
    }
}

/// Formats `Name: value` with CRLF, folding before spaces so lines stay
/// within [`FOLD_WIDTH`] where the words allow.
#[must_use]
pub fn fold_field(name: &str, value: &str) -> String {
    let mut out = canonical_name(name);
    out.push(':');
    let mut line_len = out.len();
    let mut first = true;
    for word in value.split(' ') {
        if !first && !word.is_empty() && line_len + 1 + word.len() > FOLD_WIDTH {
            out.push_str("\r\n");
            line_len = 0;
        }
        out.push(' ');
        out.push_str(word);
        line_len += 1 + word.len();
        first = false;
    }
    out.push_str("\r\n");
    out
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            f.write_str(&fold_field(name, value))?;
        }
        Ok(())
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.add(name.as_ref(), value);
        }
        headers
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transform::SliceSource;

    fn read(data: &[u8]) -> Result<Headers> {
        Headers::read(&mut SliceSource::new(data), &ParseOptions::default())
    }

    #[test]
    fn test_add_get_set_remove() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("Subject", "Hi");
        headers.add("To", "bob@example.com");
        assert_eq!(headers.get("to"), Some("alice@example.com"));
        assert_eq!(headers.get_all("TO"), ["alice@example.com", "bob@example.com"]);
        assert_eq!(headers.count("to"), 2);

        headers.set("To", "carol@example.com");
        assert_eq!(headers.get_all("to"), ["carol@example.com"]);
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["to", "subject"]);

        assert!(headers.remove("Subject"));
        assert!(!headers.remove("Subject"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_read_unfolds_and_keeps_order() {
        let headers = read(
            b"Received: from a\r\nSubject: one\r\n two\r\nReceived: from b\r\n\r\nbody",
        )
        .unwrap();
        let fields: Vec<_> = headers.iter().collect();
        assert_eq!(
            fields,
            [
                ("received", "from a"),
                ("subject", "one two"),
                ("received", "from b"),
            ]
        );
    }

    #[test]
    fn test_read_stops_after_blank_line() {
        let mut source = SliceSource::new(b"A: 1\r\n\r\nrest");
        let headers = Headers::read(&mut source, &ParseOptions::default()).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(source.read_to_end().unwrap(), b"rest");
    }

    #[test]
    fn test_read_to_end_of_stream() {
        let headers = read(b"Subject: no body").unwrap();
        assert_eq!(headers.get("subject"), Some("no body"));
        assert!(read(b"").unwrap().is_empty());
    }

    #[test]
    fn test_read_rejects_bad_lines() {
        assert!(matches!(
            read(b"Subject: a\nTo: b\r\n\r\n"),
            Err(Error::InvalidHeader { .. })
        ));
        assert!(read(b"Subject: a\rb\r\n\r\n").is_err());
        assert!(read(b"no colon here\r\n\r\n").is_err());
        assert!(read(b" leading continuation\r\n\r\n").is_err());
        assert!(read(b"Bad Name: x\r\n\r\n").is_err());
    }

    #[test]
    fn test_read_line_length_limit() {
        let long = format!("Subject: {}\r\n\r\n", "x".repeat(1000));
        assert!(read(long.as_bytes()).is_err());

        let options = ParseOptions::new().max_header_line_length(2000);
        let headers = Headers::read(&mut SliceSource::new(long.as_bytes()), &options).unwrap();
        assert_eq!(headers.get("subject").map(str::len), Some(1000));
    }

    #[test]
    fn test_read_eight_bit_values() {
        let headers = read(b"Subject: caf\xe9\r\n\r\n").unwrap();
        assert_eq!(headers.get("subject"), Some("caf\u{FFFD}"));
        assert!(matches!(
            read(b"To: caf\xe9@example.com\r\n\r\n"),
            Err(Error::InvalidHeader { name, .. }) if name == "to"
        ));
        let headers = read("Subject: café\r\n\r\n".as_bytes()).unwrap();
        assert_eq!(headers.get("subject"), Some("café"));
    }

    #[test]
    fn test_obsolete_space_before_colon() {
        let headers = read(b"Subject : hi\r\n\r\n").unwrap();
        assert_eq!(headers.get("subject"), Some("hi"));
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("content-type"), "Content-Type");
        assert_eq!(canonical_name("MESSAGE-ID"), "Message-ID");
        assert_eq!(canonical_name("x-custom-field"), "X-Custom-Field");
    }

    #[test]
    fn test_fold_field() {
        let value = "word ".repeat(30);
        let folded = fold_field("subject", value.trim_end());
        for line in folded.trim_end_matches("\r\n").split("\r\n") {
            assert!(line.len() <= FOLD_WIDTH, "{line:?}");
        }
        assert!(folded.starts_with("Subject: word word"));
        let unfolded = folded.trim_end_matches("\r\n").replace("\r\n", "");
        assert_eq!(unfolded, format!("Subject: {}", value.trim_end()));
    }

    #[test]
    fn test_fold_keeps_long_word_whole() {
        let word = "x".repeat(100);
        assert_eq!(fold_field("x-long", &word), format!("X-Long: {word}\r\n"));
    }
}
