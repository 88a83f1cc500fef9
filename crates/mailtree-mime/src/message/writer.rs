//! Message generation.

use super::Message;
use crate::encoding::{TransferEncoding, encode_base64, encode_quoted_printable};
use crate::header::media_type::MediaType;
use crate::header::{FOLD_WIDTH, field, fold_field};
use crate::rfc2047::EncodedWordEncoder;

/// Fields written from the entity itself rather than from its header list.
const MANAGED_FIELDS: &[&str] = &["content-type", "content-transfer-encoding", "mime-version"];

/// Serializes `message` and its parts.
pub(super) fn generate(message: &Message) -> Vec<u8> {
    let mut writer = Writer {
        encoder: EncodedWordEncoder::new(),
        next_boundary: 0,
        out: Vec::new(),
    };
    writer.entity(message, true);
    writer.out
}

struct Writer {
    encoder: EncodedWordEncoder,
    next_boundary: usize,
    out: Vec<u8>,
}

impl Writer {
    fn field(&mut self, name: &str, value: &str) {
        let value = field::parser_for(name).encode(value, &self.encoder);
        self.out.extend_from_slice(fold_field(name, &value).as_bytes());
    }

    fn entity(&mut self, message: &Message, top_level: bool) {
        for (name, value) in message.headers().iter() {
            if !MANAGED_FIELDS.contains(&name) {
                self.field(name, value);
            }
        }
        if top_level {
            self.field("mime-version", "1.0");
        }

        if message.is_multipart() {
            let first = self.next_boundary;
            self.next_boundary += 1;
            let parts: Vec<Vec<u8>> = message
                .parts()
                .iter()
                .map(|part| {
                    let outer = std::mem::take(&mut self.out);
                    self.entity(part, false);
                    std::mem::replace(&mut self.out, outer)
                })
                .collect();
            let boundary = self.pick_boundary(first, &parts);
            let content_type = message
                .content_type()
                .clone()
                .with_parameter("boundary", boundary.as_str());
            self.field("content-type", &content_type.to_string());
            self.out.extend_from_slice(b"\r\n");
            tracing::trace!(%boundary, parts = parts.len(), "Writing multipart body");

            for part in &parts {
                self.out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                self.out.extend_from_slice(part);
                self.out.extend_from_slice(b"\r\n");
            }
            self.out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
            return;
        }

        let body = message.body().unwrap_or_default();
        let encoding = choose_encoding(message.content_type(), body);
        self.field("content-type", &message.content_type().to_string());
        if encoding != TransferEncoding::SevenBit {
            self.field("content-transfer-encoding", &encoding.to_string());
        }
        self.out.extend_from_slice(b"\r\n");
        match encoding {
            TransferEncoding::QuotedPrintable => {
                self.out.extend_from_slice(encode_quoted_printable(body).as_bytes());
            }
            TransferEncoding::Base64 => {
                self.out.extend_from_slice(encode_base64(body).as_bytes());
            }
            _ => self.out.extend_from_slice(body),
        }
    }

    /// First `=_<n>` boundary, from `first` on, whose delimiter occurs in none
    /// of the serialized parts. Raw `message/*` bodies may carry delimiters of
    /// their own.
    fn pick_boundary(&mut self, first: usize, parts: &[Vec<u8>]) -> String {
        let mut index = first;
        loop {
            let boundary = format!("=_{index}");
            let delimiter = format!("--{boundary}");
            if !parts.iter().any(|part| contains(part, delimiter.as_bytes())) {
                self.next_boundary = self.next_boundary.max(index + 1);
                return boundary;
            }
            index += 1;
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Whether `body` can travel as `7bit` without any delimiter ambiguity.
fn is_seven_bit_safe(body: &[u8]) -> bool {
    if body.iter().any(|&b| b == 0 || b >= 0x80) {
        return false;
    }
    let mut lines = body.split(|&b| b == b'\n').peekable();
    while let Some(line) = lines.next() {
        let last = lines.peek().is_none();
        let line = if last {
            line
        } else if let Some(stripped) = line.strip_suffix(b"\r") {
            stripped
        } else {
            return false;
        };
        if line.contains(&b'\r') || line.len() > FOLD_WIDTH || line.starts_with(b"--") {
            return false;
        }
    }
    true
}

/// Picks the transfer encoding for a body.
fn choose_encoding(content_type: &MediaType, body: &[u8]) -> TransferEncoding {
    if is_seven_bit_safe(body) {
        return TransferEncoding::SevenBit;
    }
    if content_type.is_message() {
        // Message bodies may not be encoded.
        return TransferEncoding::Binary;
    }
    let escaped = body
        .iter()
        .filter(|&&b| b == b'=' || !(b.is_ascii_graphic() || b.is_ascii_whitespace()))
        .count();
    if escaped * 3 <= body.len() {
        TransferEncoding::QuotedPrintable
    } else {
        TransferEncoding::Base64
    }
}
