//! Streaming base64 decoder (RFC 2045 6.8).

use super::Transform;
use crate::error::{Error, Result};

/// Marks bytes outside the base64 alphabet.
const INVALID: i8 = -1;

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn build_decode_table() -> [i8; 256] {
    let mut table = [INVALID; 256];
    let alphabet = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut i = 0;
    while i < alphabet.len() {
        table[alphabet[i] as usize] = i as i8;
        i += 1;
    }
    table
}

static DECODE_TABLE: [i8; 256] = build_decode_table();

/// Streaming base64 decoder.
///
/// Line breaks are skipped; characters outside the alphabet are ignored as
/// RFC 2045 requires. A run longer than the configured line length between
/// line breaks is malformed (a limit of 0 disables the check). Data after the
/// first `=` pad is drained and discarded.
#[derive(Debug)]
pub struct Base64<S> {
    input: S,
    max_line_length: usize,
    line_length: usize,
    out: [u8; 3],
    out_pos: usize,
    out_len: usize,
    padded: bool,
    finished: bool,
}

impl<S: Transform> Base64<S> {
    /// Wraps a source. `max_line_length` of 0 means unlimited.
    pub const fn new(input: S, max_line_length: usize) -> Self {
        Self {
            input,
            max_line_length,
            line_length: 0,
            out: [0; 3],
            out_pos: 0,
            out_len: 0,
            padded: false,
            finished: false,
        }
    }

    /// Decodes the next quantum into the output buffer.
    #[allow(clippy::cast_possible_truncation)]
    fn fill(&mut self) -> Result<()> {
        let mut acc: u32 = 0;
        let mut count = 0;
        while count < 4 {
            let Some(byte) = self.input.read_byte()? else {
                self.finished = true;
                break;
            };
            match byte {
                b'\r' | b'\n' => self.line_length = 0,
                b'=' => {
                    self.padded = true;
                    break;
                }
                _ => {
                    self.line_length += 1;
                    if self.max_line_length > 0 && self.line_length > self.max_line_length {
                        return Err(Error::MalformedEncoding(format!(
                            "base64 line exceeds {} characters",
                            self.max_line_length
                        )));
                    }
                    let value = DECODE_TABLE[usize::from(byte)];
                    if value != INVALID {
                        acc = (acc << 6) | u32::from(value.unsigned_abs());
                        count += 1;
                    }
                }
            }
        }

        match count {
            0 => self.out_len = 0,
            1 => {
                return Err(Error::MalformedEncoding(
                    "base64 data ends with a single character".into(),
                ));
            }
            2 => {
                self.out[0] = (acc >> 4) as u8;
                self.out_len = 1;
            }
            3 => {
                self.out[0] = (acc >> 10) as u8;
                self.out[1] = (acc >> 2) as u8;
                self.out_len = 2;
            }
            _ => {
                self.out[0] = (acc >> 16) as u8;
                self.out[1] = (acc >> 8) as u8;
                self.out[2] = acc as u8;
                self.out_len = 3;
            }
        }
        self.out_pos = 0;
        Ok(())
    }
}

impl<S: Transform> Transform for Base64<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        loop {
            if self.out_pos < self.out_len {
                let byte = self.out[self.out_pos];
                self.out_pos += 1;
                return Ok(Some(byte));
            }
            if self.finished {
                return Ok(None);
            }
            if self.padded {
                while self.input.read_byte()?.is_some() {}
                self.finished = true;
                return Ok(None);
            }
            self.fill()?;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transform::SliceSource;

    fn decode(input: &[u8]) -> Result<Vec<u8>> {
        Base64::new(SliceSource::new(input), 76).read_to_end()
    }

    #[test]
    fn test_decode_padded() {
        assert_eq!(decode(b"SGVsbG8=").unwrap(), b"Hello");
        assert_eq!(decode(b"SGVsbG8sIFdvcmxkIQ==").unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_decode_unpadded_leftovers() {
        assert_eq!(decode(b"SGVsbG8").unwrap(), b"Hello");
        assert_eq!(decode(b"SGk").unwrap(), b"Hi");
        assert_eq!(decode(b"SA").unwrap(), b"H");
    }

    #[test]
    fn test_single_leftover_is_malformed() {
        assert!(matches!(decode(b"SGVsb"), Err(Error::MalformedEncoding(_))));
    }

    #[test]
    fn test_line_breaks_ignored() {
        assert_eq!(decode(b"SGVs\r\nbG8=\r\n").unwrap(), b"Hello");
        assert_eq!(decode(b"SGVs\nbG8=").unwrap(), b"Hello");
    }

    #[test]
    fn test_line_too_long() {
        let long = vec![b'A'; 80];
        assert!(decode(&long).is_err());
        let unlimited = Base64::new(SliceSource::new(&long), 0).read_to_end().unwrap();
        assert_eq!(unlimited.len(), 60);
    }

    #[test]
    fn test_data_after_padding_is_drained() {
        let mut source = SliceSource::new(b"SGk=junk");
        let out = Base64::new(&mut source, 76).read_to_end().unwrap();
        assert_eq!(out, b"Hi");
        assert_eq!(source.position(), 8);
    }

    #[test]
    fn test_empty() {
        assert!(decode(b"").unwrap().is_empty());
        assert!(decode(b"\r\n").unwrap().is_empty());
    }
}
