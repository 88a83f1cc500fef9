//! Content-Transfer-Encoding values and whole-buffer encode/decode helpers.
//!
//! The decoders here drive the streaming transforms in [`crate::transform`]
//! over an in-memory slice; the encoders are the write-path counterparts used
//! when generating messages.

use std::fmt;
use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Result;
use crate::transform::{Base64, QuotedPrintable, SliceSource, Transform};

/// Maximum encoded line length for base64 and quoted-printable output.
const MAX_LINE_LENGTH: usize = 76;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit data in lines.
    EightBit,
    /// Binary (no encoding).
    Binary,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Base64 encoding.
    Base64,
    /// Unrecognized mechanism; the body is treated as opaque bytes.
    Unknown,
}

impl TransferEncoding {
    /// Parses a mechanism token (already stripped of comments and whitespace).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "7bit" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            "quoted-printable" => Self::QuotedPrintable,
            "base64" => Self::Base64,
            _ => Self::Unknown,
        }
    }

    /// Whether this is an identity encoding (7bit, 8bit or binary).
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::SevenBit | Self::EightBit | Self::Binary)
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Binary => write!(f, "binary"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Base64 => write!(f, "base64"),
            Self::Unknown => write!(f, "x-unknown"),
        }
    }
}

/// Encodes data as base64 in CRLF-separated lines of 76 characters.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);
    for (i, chunk) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        // Base64 output is ASCII.
        result.extend(chunk.iter().map(|&b| char::from(b)));
    }
    result
}

/// Decodes base64 data, ignoring line breaks and line length.
///
/// # Errors
///
/// Returns an error if the data ends with a dangling character.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    Base64::new(SliceSource::new(data), 0).read_to_end()
}

/// Encodes bytes as quoted-printable (RFC 2045 6.7).
///
/// CRLF pairs become hard line breaks; lone CR and LF are escaped so that
/// arbitrary binary data survives a round trip. Whitespace before a line
/// break or at the end is escaped, and lines are soft-broken before 76
/// characters.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() + data.len() / 8);
    let mut line_length = 0;
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte == b'\r' && data.get(i + 1) == Some(&b'\n') {
            result.push_str("\r\n");
            line_length = 0;
            i += 2;
            continue;
        }

        let at_line_end = match data.get(i + 1) {
            None => true,
            Some(b'\r') => data.get(i + 2) == Some(&b'\n'),
            Some(_) => false,
        };
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !at_line_end,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Leave room for the '=' of a soft break unless this ends the line.
        let limit = if at_line_end { MAX_LINE_LENGTH } else { MAX_LINE_LENGTH - 1 };
        if line_length + width > limit {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
        i += 1;
    }

    result
}

/// Decodes quoted-printable data.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or, when
/// `lenient` is false, bare line breaks.
pub fn decode_quoted_printable(data: &[u8], lenient: bool) -> Result<Vec<u8>> {
    QuotedPrintable::new(SliceSource::new(data), lenient).read_to_end()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::Unknown);
        assert!(TransferEncoding::Binary.is_identity());
        assert!(!TransferEncoding::Base64.is_identity());
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode_base64(encoded.as_bytes()).unwrap(), data);
    }

    #[test]
    fn test_base64_line_wrapping() {
        let encoded = encode_base64(&[0u8; 100]);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 76);
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");
        assert_eq!(encode_quoted_printable("Héllo".as_bytes()), "H=C3=A9llo");
        assert_eq!(encode_quoted_printable(b"a=b"), "a=3Db");
        assert_eq!(encode_quoted_printable(b"end \r\nnext\t"), "end=20\r\nnext=09");
        assert_eq!(encode_quoted_printable(b"lone\nLF"), "lone=0ALF");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let encoded = encode_quoted_printable(&[b'x'; 200]);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76, "line too long: {}", line.len());
        }
        assert_eq!(decode_quoted_printable(encoded.as_bytes(), false).unwrap(), vec![b'x'; 200]);
    }

    #[test]
    fn test_quoted_printable_decode() {
        let decoded = decode_quoted_printable(b"H=C3=A9llo", true).unwrap();
        assert_eq!(decoded, "Héllo".as_bytes());
        let decoded = decode_quoted_printable(b"Hello=\r\nWorld", true).unwrap();
        assert_eq!(decoded, b"HelloWorld");
    }

    proptest! {
        #[test]
        fn prop_base64_round_trip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = encode_base64(&data);
            let decoded = Base64::new(SliceSource::new(encoded.as_bytes()), MAX_LINE_LENGTH)
                .read_to_end()
                .unwrap();
            prop_assert_eq!(decoded, data);
        }

        #[test]
        fn prop_quoted_printable_round_trip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = encode_quoted_printable(&data);
            let decoded = decode_quoted_printable(encoded.as_bytes(), false).unwrap();
            prop_assert_eq!(decoded, data);
        }
    }
}
