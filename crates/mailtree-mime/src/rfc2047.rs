//! RFC 2047 encoded words in header text.

use std::fmt::Write as _;

use crate::charset;
use crate::encoding::decode_base64;

/// Longest encoded word RFC 2047 permits, delimiters included.
pub const MAX_ENCODED_WORD_LENGTH: usize = 75;

const ENCODED_WORD_PREFIX: &str = "=?utf-8?Q?";
const ENCODED_WORD_SUFFIX: &str = "?=";

/// Where in a header the text being decoded came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedWordContext {
    /// Unstructured field bodies such as `Subject`.
    Unstructured,
    /// Display names and other phrases.
    Phrase,
    /// Text inside a comment; parentheses also delimit words.
    Comment,
}

impl EncodedWordContext {
    const fn is_delimiter(self, byte: u8) -> bool {
        match self {
            Self::Comment => matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')'),
            Self::Unstructured | Self::Phrase => matches!(byte, b' ' | b'\t' | b'\r' | b'\n'),
        }
    }
}

/// One syntactically valid encoded word.
struct EncodedWord<'a> {
    len: usize,
    charset: &'a str,
    encoding: u8,
    text: &'a str,
}

/// Splits the encoded word at the start of `s`, if there is one.
fn split_encoded_word(s: &str) -> Option<EncodedWord<'_>> {
    let rest = s.strip_prefix("=?")?;
    let charset_end = rest.find('?')?;
    let charset = &rest[..charset_end];
    let rest = &rest[charset_end + 1..];
    let mut chars = rest.bytes();
    let encoding = chars.next()?;
    if chars.next()? != b'?' {
        return None;
    }
    let rest = &rest[2..];
    let text_end = rest.find('?')?;
    if !rest[text_end..].starts_with("?=") {
        return None;
    }
    let text = &rest[..text_end];
    let len = 2 + charset_end + 1 + 2 + text_end + 2;

    let valid_charset = !charset.is_empty()
        && charset
            .chars()
            .all(|c| c == '*' || crate::header::grammar::is_token_char(c));
    let valid_text = text.bytes().all(|b| b.is_ascii_graphic());
    (valid_charset && valid_text && len <= MAX_ENCODED_WORD_LENGTH).then_some(EncodedWord {
        len,
        charset,
        encoding,
        text,
    })
}

fn hex_value(byte: u8) -> Option<u8> {
    char::from(byte)
        .to_digit(16)
        .and_then(|v| u8::try_from(v).ok())
}

/// Decodes the `Q` encoding.
fn decode_q(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            b'=' => {
                let high = hex_value(*bytes.get(i + 1)?)?;
                let low = hex_value(*bytes.get(i + 2)?)?;
                out.push((high << 4) | low);
                i += 3;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    Some(out)
}

fn decode_word(word: &EncodedWord<'_>) -> Option<String> {
    let bytes = match word.encoding {
        b'B' | b'b' => decode_base64(word.text.as_bytes()).ok()?,
        b'Q' | b'q' => decode_q(word.text)?,
        _ => return None,
    };
    // A language tag may follow the charset (RFC 2231 5).
    let label = word.charset.split('*').next().unwrap_or_default();
    if charset::is_ascii_label(label.trim()) && !bytes.is_ascii() {
        tracing::debug!(charset = label, "8-bit bytes in a us-ascii encoded word");
        return None;
    }
    let decoded = charset::decode(label, &bytes);
    if decoded.is_none() {
        tracing::debug!(charset = label, "Unsupported charset in encoded word");
    }
    decoded
}

/// Adjacent decoded words, with the raw span they came from.
struct Run {
    raw_start: usize,
    raw_end: usize,
    decoded: String,
}

impl Run {
    fn flush(self, source: &str, out: &mut String) {
        // Decoded text that itself looks encoded is kept raw so that a second
        // pass changes nothing.
        if self.decoded.contains("=?") {
            out.push_str(&source[self.raw_start..self.raw_end]);
        } else {
            out.push_str(&self.decoded);
        }
    }
}

/// Replaces the encoded words in `text` with their decoded text.
///
/// Words must be delimited by white space (or parentheses in comments) and
/// be at most 75 characters long. White space between two adjacent encoded
/// words is dropped; white space between an encoded word and plain text is
/// kept. A word with an unsupported charset or undecodable data is left as
/// it is.
#[must_use]
pub fn decode_encoded_words(text: &str, context: EncodedWordContext) -> String {
    if !text.contains("=?") {
        return text.to_string();
    }

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut run: Option<Run> = None;
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < text.len() {
        let at_word_start = text[pos..].starts_with("=?")
            && (pos == 0 || context.is_delimiter(bytes[pos - 1]));
        if at_word_start {
            if let Some(word) = split_encoded_word(&text[pos..]) {
                let end = pos + word.len;
                let delimited = end == text.len() || context.is_delimiter(bytes[end]);
                if let Some(decoded) = delimited.then(|| decode_word(&word)).flatten() {
                    let gap = &text[literal_start..pos];
                    let blank_gap = gap.bytes().all(|b| b.is_ascii_whitespace());
                    match run.as_mut() {
                        Some(current) if blank_gap => {
                            current.raw_end = end;
                            current.decoded.push_str(&decoded);
                        }
                        _ => {
                            if let Some(done) = run.take() {
                                done.flush(text, &mut out);
                            }
                            out.push_str(gap);
                            run = Some(Run {
                                raw_start: pos,
                                raw_end: end,
                                decoded,
                            });
                        }
                    }
                    literal_start = end;
                    pos = end;
                    continue;
                }
            }
        }
        pos += text[pos..].chars().next().map_or(1, char::len_utf8);
    }

    if let Some(done) = run {
        done.flush(text, &mut out);
    }
    out.push_str(&text[literal_start..]);
    out
}

/// Characters that stand for themselves in `Q` text in every context.
const fn is_q_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '!' | '*' | '+' | '-' | '/')
}

/// Whether a word of unstructured text must be encoded to survive as ASCII.
fn needs_encoding(word: &str) -> bool {
    !word.is_ascii()
        || word.contains("=?")
        || word.bytes().any(|b| b.is_ascii_control() && b != b'\t')
}

/// Q-encodes text into `=?utf-8?Q?...?=` words.
///
/// Each word is at most the configured length. Characters are never split
/// across words. Consecutive words are separated by a single space, which
/// both marks a folding point and is dropped again when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedWordEncoder {
    max_word_length: usize,
}

impl Default for EncodedWordEncoder {
    fn default() -> Self {
        Self {
            max_word_length: MAX_ENCODED_WORD_LENGTH,
        }
    }
}

impl EncodedWordEncoder {
    /// Creates an encoder producing words of at most 75 characters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum word length, clamped to what RFC 2047 allows.
    #[must_use]
    pub fn max_word_length(mut self, max: usize) -> Self {
        let overhead = ENCODED_WORD_PREFIX.len() + ENCODED_WORD_SUFFIX.len();
        // Room for at least one encoded UTF-8 sequence.
        self.max_word_length = max.clamp(overhead + 12, MAX_ENCODED_WORD_LENGTH);
        self
    }

    /// Encodes all of `text`.
    #[must_use]
    pub fn encode(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let budget =
            self.max_word_length - ENCODED_WORD_PREFIX.len() - ENCODED_WORD_SUFFIX.len();
        let mut words = Vec::new();
        let mut current = String::new();
        let mut piece = String::with_capacity(12);
        for c in text.chars() {
            piece.clear();
            if c == ' ' {
                piece.push('_');
            } else if is_q_safe(c) {
                piece.push(c);
            } else {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(piece, "={byte:02X}");
                }
            }
            if !current.is_empty() && current.len() + piece.len() > budget {
                words.push(std::mem::take(&mut current));
            }
            current.push_str(&piece);
        }
        words.push(current);

        let mut out = String::new();
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(ENCODED_WORD_PREFIX);
            out.push_str(word);
            out.push_str(ENCODED_WORD_SUFFIX);
        }
        out
    }

    /// Encodes the words of unstructured text that are not plain ASCII,
    /// leaving the rest readable. Runs of such words, with the spaces between
    /// them, become one sequence of encoded words.
    #[must_use]
    pub fn encode_unstructured(&self, text: &str) -> String {
        if !needs_encoding(text) {
            return text.to_string();
        }
        let pieces: Vec<&str> = text.split(' ').collect();
        let mut out = String::with_capacity(text.len() * 3);
        let mut i = 0;
        while i < pieces.len() {
            if i > 0 {
                out.push(' ');
            }
            if !needs_encoding(pieces[i]) {
                out.push_str(pieces[i]);
                i += 1;
                continue;
            }
            // Extend across empty pieces only when another encoded piece
            // follows them.
            let mut last = i;
            let mut j = i + 1;
            while j < pieces.len() {
                if needs_encoding(pieces[j]) {
                    last = j;
                } else if !pieces[j].is_empty() {
                    break;
                }
                j += 1;
            }
            out.push_str(&self.encode(&pieces[i..=last].join(" ")));
            i = last + 1;
        }
        out
    }
}
