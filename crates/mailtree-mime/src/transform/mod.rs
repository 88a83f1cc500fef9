//! Pull-based byte transforms.
//!
//! Every stage implements [`Transform`]: it hands out one byte per call and
//! reports end-of-stream as `Ok(None)`. Decoders wrap a byte source or another
//! transform and own it exclusively; the multipart walker lends the shared
//! [`BoundaryChecker`] to a fresh decoder for every body part.

mod base64;
mod boundary;
mod passthrough;
mod quoted_printable;

use std::io::{BufReader, Bytes, Read};

use crate::encoding::TransferEncoding;
use crate::error::Result;
use crate::options::ParseOptions;

pub use self::base64::Base64;
pub use boundary::{BoundaryChecker, MAX_BOUNDARY_LENGTH};
pub use passthrough::{Binary, EightBit, LiberalSevenBit, SevenBit};
pub use quoted_printable::QuotedPrintable;

/// A pull-based, single-byte-at-a-time decoder stage.
pub trait Transform {
    /// Returns the next byte, or `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying data is malformed for this stage or
    /// the underlying source fails.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Reads every remaining byte into a vector.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by [`Transform::read_byte`].
    fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(byte) = self.read_byte()? {
            out.push(byte);
        }
        Ok(out)
    }
}

impl<T: Transform + ?Sized> Transform for &mut T {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
}

/// Byte source over an in-memory slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Creates a source positioned at the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }
}

impl Transform for SliceSource<'_> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.data.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }
}

/// Byte source over any [`Read`] implementation.
pub struct ReaderSource<R: Read> {
    bytes: Bytes<BufReader<R>>,
}

impl<R: Read> ReaderSource<R> {
    /// Wraps a reader in a buffered byte source.
    pub fn new(reader: R) -> Self {
        Self {
            bytes: BufReader::new(reader).bytes(),
        }
    }
}

impl<R: Read> Transform for ReaderSource<R> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.bytes.next().transpose()?)
    }
}

/// Byte cursor with a one-byte push-back slot.
#[derive(Debug)]
pub struct StreamWithUnget<S> {
    inner: S,
    saved: Option<u8>,
}

impl<S: Transform> StreamWithUnget<S> {
    /// Wraps a source.
    pub const fn new(inner: S) -> Self {
        Self { inner, saved: None }
    }

    /// Pushes one byte back so the next read returns it.
    ///
    /// Only a single byte may be pending at a time.
    pub fn unget(&mut self, byte: u8) {
        debug_assert!(self.saved.is_none(), "only one byte may be pushed back");
        self.saved = Some(byte);
    }

    /// Returns the next byte without consuming it.
    ///
    /// # Errors
    ///
    /// Propagates errors from the wrapped source.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        if self.saved.is_none() {
            self.saved = self.inner.read_byte()?;
        }
        Ok(self.saved)
    }
}

impl<S: Transform> Transform for StreamWithUnget<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.saved.take() {
            Some(byte) => Ok(Some(byte)),
            None => self.inner.read_byte(),
        }
    }
}

/// Selects the body decoder for a transfer encoding.
///
/// `text_plain` relaxes the 7-bit decoder: stray 8-bit bytes in `text/plain`
/// bodies are replaced with `?` instead of failing the parse.
pub fn decoder_for<'s, S: Transform + 's>(
    source: S,
    encoding: TransferEncoding,
    text_plain: bool,
    options: &ParseOptions,
) -> Box<dyn Transform + 's> {
    match encoding {
        TransferEncoding::Base64 => Box::new(Base64::new(source, options.max_base64_line_length)),
        TransferEncoding::QuotedPrintable => {
            Box::new(QuotedPrintable::new(source, options.lenient_line_breaks))
        }
        TransferEncoding::SevenBit if text_plain => Box::new(LiberalSevenBit::new(source)),
        TransferEncoding::SevenBit => Box::new(SevenBit::new(source)),
        TransferEncoding::EightBit => Box::new(EightBit::new(source)),
        TransferEncoding::Binary | TransferEncoding::Unknown => Box::new(Binary::new(source)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source() {
        let mut source = SliceSource::new(b"ab");
        assert_eq!(source.read_byte().unwrap(), Some(b'a'));
        assert_eq!(source.position(), 1);
        assert_eq!(source.read_byte().unwrap(), Some(b'b'));
        assert_eq!(source.read_byte().unwrap(), None);
        assert_eq!(source.read_byte().unwrap(), None);
    }

    #[test]
    fn test_unget_and_peek() {
        let mut stream = StreamWithUnget::new(SliceSource::new(b"xy"));
        assert_eq!(stream.read_byte().unwrap(), Some(b'x'));
        stream.unget(b'x');
        assert_eq!(stream.peek().unwrap(), Some(b'x'));
        assert_eq!(stream.read_byte().unwrap(), Some(b'x'));
        assert_eq!(stream.read_byte().unwrap(), Some(b'y'));
        assert_eq!(stream.peek().unwrap(), None);
    }

    #[test]
    fn test_reader_source() {
        let mut source = ReaderSource::new(&b"hello"[..]);
        assert_eq!(source.read_to_end().unwrap(), b"hello");
    }

    #[test]
    fn test_decoder_selection() {
        let options = ParseOptions::default();
        let mut plain = decoder_for(
            SliceSource::new(b"caf\xe9"),
            TransferEncoding::SevenBit,
            true,
            &options,
        );
        assert_eq!(plain.read_to_end().unwrap(), b"caf?");

        let mut strict = decoder_for(
            SliceSource::new(b"caf\xe9"),
            TransferEncoding::SevenBit,
            false,
            &options,
        );
        assert!(strict.read_to_end().is_err());

        let mut b64 = decoder_for(
            SliceSource::new(b"SGVsbG8="),
            TransferEncoding::Base64,
            false,
            &options,
        );
        assert_eq!(b64.read_to_end().unwrap(), b"Hello");
    }
}
