//! Identity transfer encodings with byte-range validation.

use super::Transform;
use crate::error::{Error, Result};

/// Strict `7bit`: NUL and bytes at or above 0x80 are fatal.
#[derive(Debug)]
pub struct SevenBit<S> {
    input: S,
}

impl<S: Transform> SevenBit<S> {
    /// Wraps a source.
    pub const fn new(input: S) -> Self {
        Self { input }
    }
}

impl<S: Transform> Transform for SevenBit<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.input.read_byte()? {
            Some(0) => Err(Error::MalformedEncoding("NUL byte in 7bit data".into())),
            Some(byte) if byte >= 0x80 => Err(Error::MalformedEncoding(format!(
                "invalid byte {byte:#04x} in 7bit data"
            ))),
            other => Ok(other),
        }
    }
}

/// Lenient `7bit`: NUL and 8-bit bytes become `?`.
#[derive(Debug)]
pub struct LiberalSevenBit<S> {
    input: S,
}

impl<S: Transform> LiberalSevenBit<S> {
    /// Wraps a source.
    pub const fn new(input: S) -> Self {
        Self { input }
    }
}

impl<S: Transform> Transform for LiberalSevenBit<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(self
            .input
            .read_byte()?
            .map(|byte| if byte == 0 || byte >= 0x80 { b'?' } else { byte }))
    }
}

/// `8bit`: any byte.
#[derive(Debug)]
pub struct EightBit<S> {
    input: S,
}

impl<S: Transform> EightBit<S> {
    /// Wraps a source.
    pub const fn new(input: S) -> Self {
        Self { input }
    }
}

impl<S: Transform> Transform for EightBit<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        self.input.read_byte()
    }
}

/// `binary`: any byte.
#[derive(Debug)]
pub struct Binary<S> {
    input: S,
}

impl<S: Transform> Binary<S> {
    /// Wraps a source.
    pub const fn new(input: S) -> Self {
        Self { input }
    }
}

impl<S: Transform> Transform for Binary<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        self.input.read_byte()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transform::SliceSource;

    #[test]
    fn test_seven_bit_accepts_ascii() {
        let mut t = SevenBit::new(SliceSource::new(b"Hello\r\n"));
        assert_eq!(t.read_to_end().unwrap(), b"Hello\r\n");
    }

    #[test]
    fn test_seven_bit_rejects_nul_and_high_bytes() {
        let mut t = SevenBit::new(SliceSource::new(b"a\x00"));
        assert!(matches!(
            t.read_to_end(),
            Err(Error::MalformedEncoding(_))
        ));
        let mut t = SevenBit::new(SliceSource::new(b"\xff"));
        assert!(t.read_to_end().is_err());
    }

    #[test]
    fn test_liberal_seven_bit_substitutes() {
        let mut t = LiberalSevenBit::new(SliceSource::new(b"a\x00b\xc3\xa9"));
        assert_eq!(t.read_to_end().unwrap(), b"a?b??");
    }

    #[test]
    fn test_eight_bit_and_binary_pass_everything() {
        let data = [0u8, 0x80, 0xff, b'\r'];
        assert_eq!(EightBit::new(SliceSource::new(&data)).read_to_end().unwrap(), data);
        assert_eq!(Binary::new(SliceSource::new(&data)).read_to_end().unwrap(), data);
    }
}
