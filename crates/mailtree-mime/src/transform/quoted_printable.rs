//! Streaming quoted-printable decoder (RFC 2045 6.7).

use std::collections::VecDeque;

use super::{StreamWithUnget, Transform};
use crate::error::{Error, Result};

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

/// Streaming quoted-printable decoder.
///
/// `=XX` escapes are decoded, `=` followed by a line break (optionally with
/// transport padding in between) is a soft break and produces nothing.
/// Whitespace at the end of a line is dropped; whitespace followed by more
/// text on the same line is kept, so runs of spaces and tabs are held back
/// until the next non-blank byte decides. In lenient mode bare CR and bare LF
/// become CRLF; otherwise they are malformed.
#[derive(Debug)]
pub struct QuotedPrintable<S> {
    input: StreamWithUnget<S>,
    lenient: bool,
    pending: VecDeque<u8>,
}

impl<S: Transform> QuotedPrintable<S> {
    /// Wraps a source.
    pub const fn new(input: S, lenient: bool) -> Self {
        Self {
            input: StreamWithUnget::new(input),
            lenient,
            pending: VecDeque::new(),
        }
    }

    fn bare_line_break(&self) -> Result<()> {
        if self.lenient {
            Ok(())
        } else {
            Err(Error::MalformedEncoding(
                "bare CR or LF in quoted-printable data".into(),
            ))
        }
    }

    /// Consumes the line break that starts with `first`. Returns `false` if
    /// `first` does not start a line break.
    fn line_break(&mut self, first: u8) -> Result<bool> {
        match first {
            b'\r' => match self.input.read_byte()? {
                Some(b'\n') => Ok(true),
                Some(other) => {
                    self.bare_line_break()?;
                    self.input.unget(other);
                    Ok(true)
                }
                None => {
                    self.bare_line_break()?;
                    Ok(true)
                }
            },
            b'\n' => {
                self.bare_line_break()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Handles the bytes after `=`. Returns the decoded byte, or `None` for a
    /// soft line break.
    fn escape(&mut self) -> Result<Option<u8>> {
        let Some(first) = self.input.read_byte()? else {
            return Err(Error::MalformedEncoding(
                "'=' at end of quoted-printable data".into(),
            ));
        };
        if self.line_break(first)? {
            return Ok(None);
        }
        if first == b' ' || first == b'\t' {
            loop {
                match self.input.read_byte()? {
                    Some(b' ' | b'\t') => {}
                    None => return Ok(None),
                    Some(byte) if self.line_break(byte)? => return Ok(None),
                    Some(_) => {
                        return Err(Error::MalformedEncoding(
                            "'=' followed by whitespace and text".into(),
                        ));
                    }
                }
            }
        }
        let second = self.input.read_byte()?;
        match (hex_value(first), second.and_then(hex_value)) {
            (Some(high), Some(low)) => Ok(Some((high << 4) | low)),
            _ => Err(Error::MalformedEncoding(format!(
                "invalid quoted-printable escape '={}{}'",
                char::from(first),
                second.map(char::from).unwrap_or_default()
            ))),
        }
    }
}

impl<S: Transform> Transform for QuotedPrintable<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if let Some(byte) = self.pending.pop_front() {
            return Ok(Some(byte));
        }
        loop {
            let Some(byte) = self.input.read_byte()? else {
                return Ok(None);
            };
            match byte {
                b'\r' | b'\n' => {
                    self.line_break(byte)?;
                    self.pending.push_back(b'\n');
                    return Ok(Some(b'\r'));
                }
                b'=' => {
                    if let Some(decoded) = self.escape()? {
                        return Ok(Some(decoded));
                    }
                }
                b' ' | b'\t' => {
                    let mut blanks = vec![byte];
                    loop {
                        match self.input.read_byte()? {
                            Some(blank @ (b' ' | b'\t')) => blanks.push(blank),
                            Some(next @ (b'\r' | b'\n')) => {
                                self.input.unget(next);
                                break;
                            }
                            None => return Ok(None),
                            Some(next) => {
                                self.input.unget(next);
                                self.pending.extend(blanks.drain(1..));
                                return Ok(Some(byte));
                            }
                        }
                    }
                }
                other => return Ok(Some(other)),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transform::SliceSource;

    fn decode(input: &[u8]) -> Result<Vec<u8>> {
        QuotedPrintable::new(SliceSource::new(input), true).read_to_end()
    }

    fn decode_strict(input: &[u8]) -> Result<Vec<u8>> {
        QuotedPrintable::new(SliceSource::new(input), false).read_to_end()
    }

    #[test]
    fn test_escapes() {
        assert_eq!(decode(b"H=C3=A9llo").unwrap(), "Héllo".as_bytes());
        assert_eq!(decode(b"a=3db").unwrap(), b"a=b");
    }

    #[test]
    fn test_soft_line_break() {
        assert_eq!(
            decode(b"Caf=E9=\r\nAmericano").unwrap(),
            b"Caf\xe9Americano"
        );
        assert_eq!(decode(b"a= \t\r\nb").unwrap(), b"ab");
        assert_eq!(decode(b"a=\nb").unwrap(), b"ab");
    }

    #[test]
    fn test_trailing_whitespace_dropped() {
        assert_eq!(decode(b"one  \r\ntwo").unwrap(), b"one\r\ntwo");
        assert_eq!(decode(b"one \t").unwrap(), b"one");
    }

    #[test]
    fn test_inner_whitespace_kept() {
        assert_eq!(decode(b"a  \tb").unwrap(), b"a  \tb");
    }

    #[test]
    fn test_bare_line_breaks() {
        assert_eq!(decode(b"a\nb\rc").unwrap(), b"a\r\nb\r\nc");
        assert!(decode_strict(b"a\nb").is_err());
        assert_eq!(decode_strict(b"a\r\nb").unwrap(), b"a\r\nb");
    }

    #[test]
    fn test_malformed_escapes() {
        assert!(matches!(decode(b"a=zz"), Err(Error::MalformedEncoding(_))));
        assert!(decode(b"a=4").is_err());
        assert!(decode(b"a=").is_err());
        assert!(decode(b"a= x").is_err());
    }
}
