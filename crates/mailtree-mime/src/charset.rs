//! Character set lookup for encoded words and text bodies.

use encoding_rs::Encoding;

/// Labels treated as strict 7-bit ASCII rather than the windows-1252
/// superset that the WHATWG registry maps them to.
const ASCII_LABELS: &[&str] = &["us-ascii", "ascii", "us", "iso646-us", "ansi_x3.4-1968"];

/// Whether `label` names plain 7-bit ASCII.
pub(crate) fn is_ascii_label(label: &str) -> bool {
    ASCII_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label))
}

/// Whether `label` names a character set that can be decoded.
#[must_use]
pub fn is_supported(label: &str) -> bool {
    let label = label.trim();
    is_ascii_label(label) || Encoding::for_label(label.as_bytes()).is_some()
}

/// Decodes `bytes` in the named character set.
///
/// Returns `None` if the label is unknown. Bytes that are invalid for the
/// charset decode to U+FFFD; for `us-ascii` that includes every byte at or
/// above 0x80.
#[must_use]
pub fn decode(label: &str, bytes: &[u8]) -> Option<String> {
    let label = label.trim();
    if is_ascii_label(label) {
        return Some(
            bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { '\u{FFFD}' })
                .collect(),
        );
    }
    let encoding = Encoding::for_label(label.as_bytes())?;
    let (decoded, _) = encoding.decode_without_bom_handling(bytes);
    Some(decoded.into_owned())
}

/// Decodes body text, falling back to lossy UTF-8 for unknown charsets.
#[must_use]
pub fn decode_lossy(label: &str, bytes: &[u8]) -> String {
    decode(label, bytes).unwrap_or_else(|| {
        tracing::debug!(charset = label, "Unknown charset, falling back to UTF-8 lossy");
        String::from_utf8_lossy(bytes).into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8() {
        assert_eq!(decode("UTF-8", "café".as_bytes()).as_deref(), Some("café"));
    }

    #[test]
    fn test_latin1() {
        assert_eq!(decode("iso-8859-1", b"caf\xe9").as_deref(), Some("café"));
    }

    #[test]
    fn test_us_ascii_is_strict() {
        assert_eq!(decode("US-ASCII", b"caf\xe9").as_deref(), Some("caf\u{FFFD}"));
    }

    #[test]
    fn test_unknown_charset() {
        assert!(!is_supported("x-no-such-charset"));
        assert!(decode("x-no-such-charset", b"abc").is_none());
        assert_eq!(decode_lossy("x-no-such-charset", b"abc"), "abc");
    }
}
