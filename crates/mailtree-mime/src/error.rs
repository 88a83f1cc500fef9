//! Error types for message parsing and generation.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
///
/// A grammar rule that does not match is not an error; it is reported as
/// `None` by the header grammar. Every variant here aborts the parse of the
/// current message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid base64 or quoted-printable byte sequence, or a byte outside the
    /// range permitted by the transfer encoding.
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// The stream ended before a required terminator.
    #[error("Premature end of message: {0}")]
    PrematureEnd(String),

    /// A header field failed its grammar or could not be read.
    #[error("Invalid header field '{name}': {reason}")]
    InvalidHeader {
        /// Lowercase field name (empty if the name itself was unreadable).
        name: String,
        /// Description of what went wrong.
        reason: String,
    },

    /// Missing or malformed `boundary` parameter on a multipart content type.
    #[error("Invalid multipart boundary: {0}")]
    InvalidBoundary(String),

    /// A field that may appear at most once appeared again.
    #[error("Duplicate header field: {0}")]
    DuplicateHeader(String),

    /// An address or named address failed validation.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A media type could not be parsed or is not allowed here.
    #[error("Invalid media type: {0}")]
    InvalidMediaType(String),

    /// The message is multipart and has no single body.
    #[error("Message has no single body (multipart)")]
    NotSinglePart,

    /// I/O error from a reader-backed byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds an [`Error::InvalidHeader`] for the given field.
    pub(crate) fn invalid_header(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
