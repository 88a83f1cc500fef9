//! Multipart boundary scanning (RFC 2046 5.1.1).

use std::collections::VecDeque;

use super::{StreamWithUnget, Transform};
use crate::error::{Error, Result};

/// Longest boundary RFC 2046 permits.
pub const MAX_BOUNDARY_LENGTH: usize = 70;

/// Longest candidate buffered after a leading `--`: a boundary plus the
/// closing `--`.
const MAX_CANDIDATE: usize = MAX_BOUNDARY_LENGTH + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Inside body content.
    Body,
    /// At the first byte of a line, where a delimiter may start.
    AtLineStart,
    /// Reading a possible delimiter line.
    CandidateBoundary,
    /// A body part's header block is being read from the raw source.
    Headers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    /// `--boundary`, index into the stack.
    Opening(usize),
    /// `--boundary--`, index into the stack.
    Closing(usize),
}

enum Candidate {
    Delimiter(Delimiter),
    Literal(Vec<u8>),
}

/// Transform that passes body bytes through until a boundary delimiter line.
///
/// The checker keeps the stack of active boundaries, innermost last. A line
/// is matched against the stack from the innermost entry outward. The line
/// break before a delimiter belongs to the delimiter and is not returned.
///
/// On an opening delimiter reads return `None` and
/// [`has_new_body_part`](Self::has_new_body_part) is set; the caller reads
/// the part's headers from [`source_mut`](Self::source_mut) between
/// [`start_body_part_headers`](Self::start_body_part_headers) and
/// [`end_body_part_headers`](Self::end_body_part_headers). A closing
/// delimiter pops its entry and everything above it; the bytes up to the next
/// delimiter of an enclosing boundary are skipped. Once the outermost
/// boundary closes, the stream is finished and the epilogue is never read.
/// End of stream while any boundary is active is [`Error::PrematureEnd`].
pub struct BoundaryChecker<'a, S> {
    input: &'a mut StreamWithUnget<S>,
    boundaries: Vec<String>,
    replay: VecDeque<u8>,
    state: State,
    new_body_part: bool,
    finished: bool,
}

impl<'a, S: Transform> BoundaryChecker<'a, S> {
    /// Creates a checker positioned at the start of a multipart body.
    pub fn new(input: &'a mut StreamWithUnget<S>, boundary: impl Into<String>) -> Self {
        Self {
            input,
            boundaries: vec![boundary.into()],
            replay: VecDeque::new(),
            state: State::AtLineStart,
            new_body_part: false,
            finished: false,
        }
    }

    /// Pushes the boundary of a nested multipart entity.
    pub fn push_boundary(&mut self, boundary: impl Into<String>) {
        self.boundaries.push(boundary.into());
    }

    /// Number of active boundaries.
    #[must_use]
    pub fn boundary_count(&self) -> usize {
        self.boundaries.len()
    }

    /// Whether an opening delimiter has been read and the next part's
    /// headers are due.
    #[must_use]
    pub const fn has_new_body_part(&self) -> bool {
        self.new_body_part
    }

    /// Whether the outermost boundary has been closed.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Switches to header reading; reads return `None` until
    /// [`end_body_part_headers`](Self::end_body_part_headers).
    pub fn start_body_part_headers(&mut self) {
        self.new_body_part = false;
        self.state = State::Headers;
    }

    /// Resumes body scanning at the start of the new part's body.
    pub fn end_body_part_headers(&mut self) {
        self.state = State::AtLineStart;
    }

    /// The raw source under the checker, for reading part headers.
    pub fn source_mut(&mut self) -> &mut StreamWithUnget<S> {
        &mut *self.input
    }

    fn premature_end() -> Error {
        Error::PrematureEnd("multipart body ended before its closing boundary".into())
    }

    fn next_raw(&mut self) -> Result<u8> {
        self.input.read_byte()?.ok_or_else(Self::premature_end)
    }

    /// Checks for a delimiter at the start of a line. `line_break` is the
    /// already consumed line break, replayed when no delimiter follows.
    /// Returns `true` when a delimiter was consumed.
    fn check_line_start(&mut self, line_break: &[u8]) -> Result<bool> {
        match self.input.read_byte()? {
            Some(b'-') => {}
            Some(other) => {
                self.input.unget(other);
                self.replay.extend(line_break);
                return Ok(false);
            }
            None => {
                self.replay.extend(line_break);
                return Ok(false);
            }
        }
        match self.input.read_byte()? {
            Some(b'-') => {}
            other => {
                if let Some(byte) = other {
                    self.input.unget(byte);
                }
                self.replay.extend(line_break);
                self.replay.push_back(b'-');
                return Ok(false);
            }
        }

        self.state = State::CandidateBoundary;
        let candidate = self.read_candidate()?;
        self.state = State::Body;
        match candidate {
            Candidate::Delimiter(delimiter) => {
                self.apply(delimiter)?;
                Ok(true)
            }
            Candidate::Literal(bytes) => {
                self.replay.extend(line_break);
                self.replay.extend(b"--");
                self.replay.extend(bytes);
                Ok(false)
            }
        }
    }

    /// Reads the rest of a line after `--`, up to [`MAX_CANDIDATE`] bytes.
    /// The terminating line break stays in the source unless the line is a
    /// delimiter.
    fn read_candidate(&mut self) -> Result<Candidate> {
        let mut line = Vec::with_capacity(MAX_CANDIDATE);
        loop {
            match self.input.read_byte()? {
                None => break,
                Some(byte @ (b'\r' | b'\n')) => {
                    self.input.unget(byte);
                    break;
                }
                Some(byte) => {
                    line.push(byte);
                    if line.len() > MAX_CANDIDATE {
                        return self.read_long_padding(line);
                    }
                }
            }
        }
        match self.match_boundary(&line) {
            Some(delimiter) => {
                self.consume_line_break()?;
                Ok(Candidate::Delimiter(delimiter))
            }
            None => Ok(Candidate::Literal(line)),
        }
    }

    /// Finishes a candidate that outgrew [`MAX_CANDIDATE`]. It is still a
    /// delimiter if the boundary is followed only by transport padding, which
    /// may be of any length; the padding is kept as runs, not byte by byte.
    fn read_long_padding(&mut self, mut line: Vec<u8>) -> Result<Candidate> {
        let Some(delimiter) = self.match_boundary(&line) else {
            return Ok(Candidate::Literal(line));
        };
        let mut runs: Vec<(u8, usize)> = Vec::new();
        loop {
            match self.input.read_byte()? {
                Some(byte @ (b' ' | b'\t')) => match runs.last_mut() {
                    Some((last, count)) if *last == byte => *count += 1,
                    _ => runs.push((byte, 1)),
                },
                Some(byte @ (b'\r' | b'\n')) => {
                    self.input.unget(byte);
                    self.consume_line_break()?;
                    return Ok(Candidate::Delimiter(delimiter));
                }
                None => return Ok(Candidate::Delimiter(delimiter)),
                Some(byte) => {
                    self.input.unget(byte);
                    for (padding, count) in runs {
                        line.resize(line.len() + count, padding);
                    }
                    return Ok(Candidate::Literal(line));
                }
            }
        }
    }

    /// Matches a candidate line (without its leading `--`) against the stack,
    /// innermost first. Only transport padding may follow the boundary.
    fn match_boundary(&self, line: &[u8]) -> Option<Delimiter> {
        for (index, boundary) in self.boundaries.iter().enumerate().rev() {
            let Some(rest) = line.strip_prefix(boundary.as_bytes()) else {
                continue;
            };
            let (closing, padding) = match rest.strip_prefix(b"--") {
                Some(padding) => (true, padding),
                None => (false, rest),
            };
            if padding.iter().all(|&b| b == b' ' || b == b'\t') {
                return Some(if closing {
                    Delimiter::Closing(index)
                } else {
                    Delimiter::Opening(index)
                });
            }
        }
        None
    }

    fn consume_line_break(&mut self) -> Result<()> {
        match self.input.read_byte()? {
            Some(b'\r') => match self.input.read_byte()? {
                Some(b'\n') | None => {}
                Some(other) => self.input.unget(other),
            },
            Some(b'\n') | None => {}
            Some(other) => self.input.unget(other),
        }
        Ok(())
    }

    fn apply(&mut self, delimiter: Delimiter) -> Result<()> {
        let mut delimiter = delimiter;
        loop {
            match delimiter {
                Delimiter::Opening(index) => {
                    self.boundaries.truncate(index + 1);
                    self.new_body_part = true;
                    return Ok(());
                }
                Delimiter::Closing(index) => {
                    self.boundaries.truncate(index);
                    if self.boundaries.is_empty() {
                        self.finished = true;
                        return Ok(());
                    }
                    delimiter = self.skip_to_delimiter()?;
                }
            }
        }
    }

    /// Discards whole lines until one is a delimiter of an active boundary.
    fn skip_to_delimiter(&mut self) -> Result<Delimiter> {
        loop {
            let first = self.next_raw()?;
            if first == b'-' {
                let second = self.next_raw()?;
                if second == b'-' {
                    if let Candidate::Delimiter(delimiter) = self.read_candidate()? {
                        return Ok(delimiter);
                    }
                } else {
                    self.input.unget(second);
                }
            } else {
                self.input.unget(first);
            }
            loop {
                match self.next_raw()? {
                    b'\n' => break,
                    b'\r' => {
                        let next = self.next_raw()?;
                        if next != b'\n' {
                            self.input.unget(next);
                        }
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

impl<S: Transform> Transform for BoundaryChecker<'_, S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if let Some(byte) = self.replay.pop_front() {
            return Ok(Some(byte));
        }
        if self.new_body_part || self.finished || self.state == State::Headers {
            return Ok(None);
        }
        if self.state == State::AtLineStart {
            self.state = State::Body;
            if self.check_line_start(b"")? {
                return Ok(None);
            }
            if let Some(byte) = self.replay.pop_front() {
                return Ok(Some(byte));
            }
        }

        let byte = self.next_raw()?;
        match byte {
            b'\r' => match self.input.read_byte()? {
                Some(b'\n') => {
                    if self.check_line_start(b"\r\n")? {
                        return Ok(None);
                    }
                    Ok(self.replay.pop_front())
                }
                Some(other) => {
                    self.input.unget(other);
                    Ok(Some(b'\r'))
                }
                None => Ok(Some(b'\r')),
            },
            b'\n' => {
                if self.check_line_start(b"\n")? {
                    return Ok(None);
                }
                Ok(self.replay.pop_front())
            }
            other => Ok(Some(other)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transform::SliceSource;

    /// Reads body bytes until the checker stops.
    fn body<S: Transform>(checker: &mut BoundaryChecker<'_, S>) -> Vec<u8> {
        checker.read_to_end().unwrap()
    }

    /// Reads a part's raw header block up to and including the blank line.
    fn skip_headers<S: Transform>(checker: &mut BoundaryChecker<'_, S>) {
        checker.start_body_part_headers();
        let source = checker.source_mut();
        let mut last = Vec::new();
        while let Some(byte) = source.read_byte().unwrap() {
            last.push(byte);
            if last.ends_with(b"\r\n\r\n") || last == b"\r\n" {
                break;
            }
        }
        checker.end_body_part_headers();
    }

    #[test]
    fn test_two_parts() {
        let data = b"preamble\r\n--X\r\n\r\nPart one\r\n--X\r\n\r\nPart two\r\n--X--\r\nepilogue";
        let mut stream = StreamWithUnget::new(SliceSource::new(data));
        let mut checker = BoundaryChecker::new(&mut stream, "X");

        assert_eq!(body(&mut checker), b"preamble");
        assert!(checker.has_new_body_part());
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), b"Part one");
        assert!(checker.has_new_body_part());
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), b"Part two");
        assert!(!checker.has_new_body_part());
        assert!(checker.is_finished());
        assert_eq!(checker.boundary_count(), 0);
    }

    #[test]
    fn test_lookalike_lines_are_content() {
        let data = b"--X\r\n\r\n--Xtra\r\n-- X\r\n--\r\n--X--\r\n";
        let mut stream = StreamWithUnget::new(SliceSource::new(data));
        let mut checker = BoundaryChecker::new(&mut stream, "X");

        assert_eq!(body(&mut checker), b"");
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), b"--Xtra\r\n-- X\r\n--");
        assert!(checker.is_finished());
    }

    #[test]
    fn test_transport_padding_allowed() {
        let data = b"--X \t\r\n\r\nbody\r\n--X-- \r\n";
        let mut stream = StreamWithUnget::new(SliceSource::new(data));
        let mut checker = BoundaryChecker::new(&mut stream, "X");
        assert_eq!(body(&mut checker), b"");
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), b"body");
        assert!(checker.is_finished());
    }

    #[test]
    fn test_long_transport_padding() {
        let mut data = b"--X\r\n\r\nbody\r\n--X--".to_vec();
        data.extend(std::iter::repeat_n(b' ', 80));
        data.extend(b"\t\t\r\nepilogue");
        let mut stream = StreamWithUnget::new(SliceSource::new(&data));
        let mut checker = BoundaryChecker::new(&mut stream, "X");
        assert_eq!(body(&mut checker), b"");
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), b"body");
        assert!(checker.is_finished());
    }

    #[test]
    fn test_long_padding_then_text_is_content() {
        let mut line = b"--X".to_vec();
        line.extend(std::iter::repeat_n(b' ', 75));
        line.extend(b"\t tail");
        let mut data = b"--X\r\n\r\n".to_vec();
        data.extend(&line);
        data.extend(b"\r\n--X--\r\n");
        let mut stream = StreamWithUnget::new(SliceSource::new(&data));
        let mut checker = BoundaryChecker::new(&mut stream, "X");
        assert_eq!(body(&mut checker), b"");
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), line);
        assert!(checker.is_finished());
    }

    #[test]
    fn test_nested_close_skips_inner_epilogue() {
        let data = b"--A\r\n\r\n--B\r\n\r\ninner\r\n--B--\r\ninner epilogue\r\n--A\r\n\r\nouter\r\n--A--\r\n";
        let mut stream = StreamWithUnget::new(SliceSource::new(data));
        let mut checker = BoundaryChecker::new(&mut stream, "A");

        assert_eq!(body(&mut checker), b"");
        skip_headers(&mut checker);
        checker.push_boundary("B");
        assert_eq!(body(&mut checker), b"");
        assert_eq!(checker.boundary_count(), 2);
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), b"inner");
        assert!(checker.has_new_body_part());
        assert_eq!(checker.boundary_count(), 1);
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), b"outer");
        assert!(checker.is_finished());
    }

    #[test]
    fn test_outer_opening_pops_inner() {
        let data = b"--A\r\n\r\n--B\r\n\r\ninner\r\n--A\r\n\r\nnext\r\n--A--\r\n";
        let mut stream = StreamWithUnget::new(SliceSource::new(data));
        let mut checker = BoundaryChecker::new(&mut stream, "A");
        body(&mut checker);
        skip_headers(&mut checker);
        checker.push_boundary("B");
        body(&mut checker);
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), b"inner");
        assert_eq!(checker.boundary_count(), 1);
    }

    #[test]
    fn test_missing_close_is_premature_end() {
        let data = b"--X\r\n\r\nbody without end\r\n";
        let mut stream = StreamWithUnget::new(SliceSource::new(data));
        let mut checker = BoundaryChecker::new(&mut stream, "X");
        body(&mut checker);
        skip_headers(&mut checker);
        assert!(matches!(
            checker.read_to_end(),
            Err(Error::PrematureEnd(_))
        ));
    }

    #[test]
    fn test_blank_lines_before_delimiter() {
        let data = b"--X\r\n\r\na\r\n\r\n\r\n--X--";
        let mut stream = StreamWithUnget::new(SliceSource::new(data));
        let mut checker = BoundaryChecker::new(&mut stream, "X");
        body(&mut checker);
        skip_headers(&mut checker);
        assert_eq!(body(&mut checker), b"a\r\n\r\n");
        assert!(checker.is_finished());
    }
}
