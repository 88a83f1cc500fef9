//! MIME message tree: parsing, access and building.

mod parser;
mod writer;

use std::io::Read;

use chrono::{DateTime, FixedOffset};

use crate::charset;
use crate::encoding::TransferEncoding;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::header::address::NamedAddress;
use crate::header::date::parse_date;
use crate::header::disposition::ContentDisposition;
use crate::header::field;
use crate::header::media_type::MediaType;
use crate::header::semantics::{self, msg_ids};
use crate::options::ParseOptions;
use crate::rfc2047::{EncodedWordContext, decode_encoded_words};
use crate::transform::{ReaderSource, SliceSource};

/// One MIME entity: a message or a body part.
///
/// A multipart entity has child parts and no body; any other entity has a
/// body and no parts. Bodies are stored with their transfer encoding
/// removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    headers: Headers,
    content_type: MediaType,
    transfer_encoding: TransferEncoding,
    body: Option<Vec<u8>>,
    parts: Vec<Message>,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// Parses a message with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is malformed; see [`Error`].
    ///
    /// # Example
    ///
    /// ```
    /// use mailtree_mime::Message;
    ///
    /// let message = Message::parse(b"Subject: =?utf-8?q?Hi=20there?=\r\n\r\nBody\r\n")?;
    /// assert_eq!(message.subject().as_deref(), Some("Hi there"));
    /// assert_eq!(message.body_text()?, "Body\r\n");
    /// # Ok::<(), mailtree_mime::Error>(())
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, &ParseOptions::default())
    }

    /// Parses a message with explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is malformed.
    pub fn parse_with(data: &[u8], options: &ParseOptions) -> Result<Self> {
        parser::parse_message(SliceSource::new(data), options)
    }

    /// Parses a message read from `reader`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the message is malformed.
    pub fn from_reader<R: Read>(reader: R, options: &ParseOptions) -> Result<Self> {
        parser::parse_message(ReaderSource::new(reader), options)
    }

    pub(crate) const fn from_parts(
        headers: Headers,
        content_type: MediaType,
        transfer_encoding: TransferEncoding,
        body: Option<Vec<u8>>,
        parts: Vec<Self>,
    ) -> Self {
        Self {
            headers,
            content_type,
            transfer_encoding,
            body,
            parts,
        }
    }

    // Access.

    /// Every header field in order.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw value of the first occurrence of a field.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Value of the first occurrence of a field with its encoded words
    /// decoded.
    #[must_use]
    pub fn decoded_header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .map(|value| field::parser_for(name).decode(value))
    }

    /// The decoded `Subject`.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.decoded_header("subject")
    }

    fn addresses(&self, name: &str) -> Result<Vec<NamedAddress>> {
        let mut all = Vec::new();
        for value in self.headers.get_all(name) {
            all.extend(semantics::parse_address_list(value)?);
        }
        Ok(all)
    }

    /// Mailboxes in `From`. Empty if the field is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the field is malformed; parsing
    /// tolerates that, so the error surfaces here instead.
    pub fn from_addresses(&self) -> Result<Vec<NamedAddress>> {
        match self.headers.get("from") {
            Some(value) => semantics::parse_mailbox_list(value),
            None => Ok(Vec::new()),
        }
    }

    /// Addresses in `To`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for a field set to an invalid value
    /// after parsing.
    pub fn to_addresses(&self) -> Result<Vec<NamedAddress>> {
        self.addresses("to")
    }

    /// Addresses in `Cc`.
    ///
    /// # Errors
    ///
    /// As for [`Message::to_addresses`].
    pub fn cc_addresses(&self) -> Result<Vec<NamedAddress>> {
        self.addresses("cc")
    }

    /// Addresses in `Bcc`.
    ///
    /// # Errors
    ///
    /// As for [`Message::to_addresses`].
    pub fn bcc_addresses(&self) -> Result<Vec<NamedAddress>> {
        self.addresses("bcc")
    }

    /// The `Date`, or `None` if absent or unreadable.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        let value = self.headers.get("date")?;
        parse_date(value)
            .inspect_err(|error| tracing::debug!(%error, "Ignoring unreadable Date field"))
            .ok()
    }

    /// The `Message-ID` without angle brackets.
    #[must_use]
    pub fn message_id(&self) -> Option<String> {
        msg_ids(self.headers.get("message-id")?).into_iter().next()
    }

    /// The media type.
    #[must_use]
    pub const fn content_type(&self) -> &MediaType {
        &self.content_type
    }

    /// The transfer encoding the body arrived in.
    #[must_use]
    pub const fn transfer_encoding(&self) -> TransferEncoding {
        self.transfer_encoding
    }

    /// Whether this entity has parts instead of a body.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.content_type.is_multipart()
    }

    /// The `Content-Disposition`, or `None` if absent or unreadable.
    #[must_use]
    pub fn content_disposition(&self) -> Option<ContentDisposition> {
        ContentDisposition::parse(self.headers.get("content-disposition")?).ok()
    }

    /// Suggested file name, from `Content-Disposition` or else the
    /// `Content-Type` `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.content_disposition()
            .and_then(|d| d.filename())
            .or_else(|| {
                let name = self.content_type.parameter("name")?;
                let decoded = decode_encoded_words(name, EncodedWordContext::Unstructured);
                let base = decoded.rsplit(['/', '\\']).next()?.trim();
                (!base.is_empty()).then(|| base.to_string())
            })
    }

    /// Decoded body bytes; `None` for multipart entities.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Body converted to text with the `charset` parameter, `us-ascii` if
    /// none is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSinglePart`] for a multipart entity.
    pub fn body_text(&self) -> Result<String> {
        let body = self.body.as_deref().ok_or(Error::NotSinglePart)?;
        let label = self.content_type.charset().unwrap_or("us-ascii");
        Ok(charset::decode_lossy(label, body))
    }

    /// Child parts in order.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        &self.parts
    }

    /// First `text/plain` entity in the tree that is not an attachment.
    #[must_use]
    pub fn text_part(&self) -> Option<&Self> {
        self.find_inline("plain")
    }

    /// First `text/html` entity in the tree that is not an attachment.
    #[must_use]
    pub fn html_part(&self) -> Option<&Self> {
        self.find_inline("html")
    }

    fn find_inline(&self, sub_type: &str) -> Option<&Self> {
        let attachment = self
            .content_disposition()
            .is_some_and(|d| d.is_attachment());
        if self.content_type.is("text", sub_type) && !attachment {
            return Some(self);
        }
        self.parts.iter().find_map(|part| part.find_inline(sub_type))
    }

    /// Parses the body of a `message/rfc822` entity.
    ///
    /// Returns `None` for other media types.
    #[must_use]
    pub fn attached_message(&self) -> Option<Result<Self>> {
        if !self.content_type.is("message", "rfc822") {
            return None;
        }
        self.body.as_deref().map(Self::parse)
    }

    // Building.

    /// Creates an empty `text/plain; charset=utf-8` message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            content_type: MediaType::text_plain_utf8(),
            transfer_encoding: TransferEncoding::SevenBit,
            body: Some(Vec::new()),
            parts: Vec::new(),
        }
    }

    /// Creates an empty `multipart/<sub_type>` message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMediaType`] if `sub_type` is not a token.
    pub fn multipart(sub_type: &str) -> Result<Self> {
        Ok(Self {
            headers: Headers::new(),
            content_type: MediaType::multipart(sub_type)?,
            transfer_encoding: TransferEncoding::SevenBit,
            body: None,
            parts: Vec::new(),
        })
    }

    fn check_field(name: &str, value: &str) -> Result<()> {
        if name.is_empty() || !name.bytes().all(|b| (33..=126).contains(&b) && b != b':') {
            return Err(Error::invalid_header(name, "invalid field name"));
        }
        if value.contains(['\r', '\n']) {
            return Err(Error::invalid_header(name, "line break in value"));
        }
        if !field::parser_for(name).validate(value) {
            return Err(Error::invalid_header(
                name,
                format!("value does not match the field grammar: {value}"),
            ));
        }
        Ok(())
    }

    /// Sets a field, replacing earlier occurrences. Setting `Content-Type`
    /// also changes the media type, which must stay multipart or stay
    /// single-part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the name or value is invalid, and
    /// [`Error::InvalidMediaType`] for a `Content-Type` change between
    /// multipart and single-part.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        Self::check_field(name, value)?;
        if name.eq_ignore_ascii_case("content-type") {
            let content_type = MediaType::parse(value)?;
            if content_type.is_multipart() != self.is_multipart() {
                return Err(Error::InvalidMediaType(format!(
                    "cannot change {} into {value}",
                    self.content_type
                )));
            }
            self.content_type = content_type;
        }
        self.headers.set(name, value);
        Ok(())
    }

    /// Appends a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] for an invalid name or value and
    /// [`Error::DuplicateHeader`] for a second occurrence of a field that
    /// may appear only once.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        let lower = name.to_ascii_lowercase();
        if parser::is_singleton(&lower) && self.headers.count(&lower) > 0 {
            return Err(Error::DuplicateHeader(lower));
        }
        if lower == "content-type" {
            return self.set_header(name, value);
        }
        Self::check_field(name, value)?;
        self.headers.add(name, value);
        Ok(())
    }

    /// Removes every occurrence of a field. Returns whether any existed.
    pub fn remove_header(&mut self, name: &str) -> bool {
        self.headers.remove(name)
    }

    /// Sets the `Subject`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the text contains a line break.
    pub fn set_subject(&mut self, subject: &str) -> Result<()> {
        self.set_header("subject", subject)
    }

    /// Replaces the body and media type of a single-part message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMediaType`] if `content_type` is multipart.
    pub fn set_body(&mut self, content_type: MediaType, body: impl Into<Vec<u8>>) -> Result<()> {
        if content_type.is_multipart() {
            return Err(Error::InvalidMediaType(format!(
                "{content_type} needs parts, not a body"
            )));
        }
        self.headers.set("content-type", content_type.to_string());
        self.content_type = content_type;
        self.body = Some(body.into());
        self.parts.clear();
        Ok(())
    }

    /// Sets a `text/plain; charset=utf-8` body.
    pub fn set_text_body(&mut self, text: &str) {
        self.replace_body(MediaType::text_plain_utf8(), text.as_bytes());
    }

    /// Sets a `text/html; charset=utf-8` body.
    pub fn set_html_body(&mut self, html: &str) {
        self.replace_body(MediaType::text_html_utf8(), html.as_bytes());
    }

    fn replace_body(&mut self, content_type: MediaType, body: &[u8]) {
        self.headers.set("content-type", content_type.to_string());
        self.content_type = content_type;
        self.body = Some(body.to_vec());
        self.parts.clear();
    }

    /// Appends a child part to a multipart message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMediaType`] if this message is not multipart.
    pub fn add_part(&mut self, part: Self) -> Result<()> {
        if !self.is_multipart() {
            return Err(Error::InvalidMediaType(format!(
                "{} cannot hold parts",
                self.content_type
            )));
        }
        self.parts.push(part);
        Ok(())
    }

    /// Serializes the message: folded ASCII-safe headers, a transfer
    /// encoding chosen per body, and generated boundaries.
    ///
    /// # Example
    ///
    /// ```
    /// use mailtree_mime::Message;
    ///
    /// let mut message = Message::new();
    /// message.set_subject("Grüße")?;
    /// message.set_text_body("Hallo");
    /// let bytes = message.generate();
    /// assert!(bytes.is_ascii());
    /// assert_eq!(Message::parse(&bytes)?.subject().as_deref(), Some("Grüße"));
    /// # Ok::<(), mailtree_mime::Error>(())
    /// ```
    #[must_use]
    pub fn generate(&self) -> Vec<u8> {
        writer::generate(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let message = Message::parse(
            b"From: \"Doe, John\" <john@example.com>\r\n\
              To: a@example.com, Team: b@example.com;\r\n\
              Cc: c@example.com\r\n\
              Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n\
              Message-ID: <1234@example.com>\r\n\
              Content-Type: text/plain; charset=iso-8859-1\r\n\
              Content-Transfer-Encoding: 8bit\r\n\
              Content-Disposition: inline\r\n\
              \r\n\
              caf\xe9",
        )
        .unwrap();

        let from = message.from_addresses().unwrap();
        assert_eq!(from[0].display_name(), Some("Doe, John"));
        let to = message.to_addresses().unwrap();
        assert_eq!(to.len(), 2);
        assert!(to[1].is_group());
        assert_eq!(message.cc_addresses().unwrap().len(), 1);
        assert!(message.bcc_addresses().unwrap().is_empty());
        assert_eq!(message.date().unwrap().to_rfc2822(), "Tue, 1 Jul 2003 10:52:37 +0200");
        assert_eq!(message.message_id().as_deref(), Some("1234@example.com"));
        assert_eq!(message.content_disposition().unwrap().kind(), "inline");
        assert_eq!(message.body_text().unwrap(), "café");
        assert_eq!(message.header("MESSAGE-ID"), Some("<1234@example.com>"));
        assert!(message.text_part().is_some());
    }

    #[test]
    fn test_malformed_from_is_reported_on_access() {
        let message = Message::parse(b"From: not an address\r\n\r\nbody").unwrap();
        assert!(matches!(message.from_addresses(), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_filename_fallback_to_name_parameter() {
        let message = Message::parse(
            b"Content-Type: application/pdf; name=\"dir/report.pdf\"\r\n\
              Content-Transfer-Encoding: base64\r\n\r\nAAEC",
        )
        .unwrap();
        assert_eq!(message.filename().as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_body_text_on_multipart() {
        let message = Message::multipart("mixed").unwrap();
        assert!(matches!(message.body_text(), Err(Error::NotSinglePart)));
        assert!(message.body().is_none());
    }

    #[test]
    fn test_builder_validation() {
        let mut message = Message::new();
        assert!(message.set_header("To", "not valid").is_err());
        assert!(message.set_header("Subject", "line\r\nbreak").is_err());
        assert!(message.set_header("Bad Name", "x").is_err());
        message.add_header("Subject", "first").unwrap();
        assert!(matches!(
            message.add_header("Subject", "second"),
            Err(Error::DuplicateHeader(_))
        ));
        message.add_header("Received", "a").unwrap();
        message.add_header("Received", "b").unwrap();
        assert_eq!(message.headers().count("received"), 2);
        assert!(message.remove_header("received"));

        assert!(message.set_header("Content-Type", "multipart/mixed; boundary=x").is_err());
        message.set_header("Content-Type", "text/html").unwrap();
        assert!(message.content_type().is("text", "html"));

        assert!(message.add_part(Message::new()).is_err());
        assert!(message
            .set_body(MediaType::multipart("mixed").unwrap(), b"x".to_vec())
            .is_err());
    }

    #[test]
    fn test_attached_message() {
        let message = Message::parse(
            b"Content-Type: message/rfc822\r\n\r\nSubject: inner\r\n\r\nhello",
        )
        .unwrap();
        let inner = message.attached_message().unwrap().unwrap();
        assert_eq!(inner.subject().as_deref(), Some("inner"));
        assert!(Message::new().attached_message().is_none());
    }
}
