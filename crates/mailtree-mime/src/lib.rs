//! # mailtree-mime
//!
//! Internet message (RFC 5322) and MIME parsing and generation.
//!
//! ## Features
//!
//! - **Message parsing**: Header blocks, nested multipart trees, digests
//! - **Transfer decoding**: Base64, Quoted-Printable, 7bit/8bit/binary as
//!   pull-based byte transforms
//! - **Header grammars**: Addresses, message IDs, dates, media types,
//!   dispositions, validated per field
//! - **Encoded words**: RFC 2047 decoding in text, phrases and comments;
//!   RFC 2231 parameter values
//! - **Message generation**: ASCII-safe headers, chosen transfer encodings,
//!   generated boundaries
//!
//! ## Quick Start
//!
//! ### Parsing Messages
//!
//! ```
//! use mailtree_mime::Message;
//!
//! let raw = b"From: Alice <alice@example.com>\r\n\
//!             Subject: =?utf-8?q?Gr=C3=BC=C3=9Fe?=\r\n\
//!             Content-Type: multipart/mixed; boundary=XX\r\n\
//!             \r\n\
//!             --XX\r\n\
//!             \r\n\
//!             Hello\r\n\
//!             --XX\r\n\
//!             Content-Type: application/octet-stream\r\n\
//!             Content-Transfer-Encoding: base64\r\n\
//!             \r\n\
//!             SGVsbG8=\r\n\
//!             --XX--\r\n";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.subject().as_deref(), Some("Grüße"));
//! assert_eq!(message.from_addresses()?[0].display_name(), Some("Alice"));
//! assert_eq!(message.parts().len(), 2);
//! assert_eq!(message.parts()[0].body_text()?, "Hello");
//! assert_eq!(message.parts()[1].body(), Some(&b"Hello"[..]));
//! # Ok::<(), mailtree_mime::Error>(())
//! ```
//!
//! ### Building Messages
//!
//! ```
//! use mailtree_mime::{ContentDisposition, MediaType, Message};
//!
//! let mut text = Message::new();
//! text.set_text_body("See attached.");
//!
//! let mut attachment = Message::new();
//! attachment.set_body(MediaType::application_octet_stream(), vec![0u8, 1, 2])?;
//! attachment.set_header(
//!     "Content-Disposition",
//!     &ContentDisposition::attachment("data.bin").to_string(),
//! )?;
//!
//! let mut message = Message::multipart("mixed")?;
//! message.add_header("From", "alice@example.com")?;
//! message.add_header("To", "Bob <bob@example.com>")?;
//! message.set_subject("Report")?;
//! message.add_part(text)?;
//! message.add_part(attachment)?;
//!
//! let bytes = message.generate();
//! assert_eq!(Message::parse(&bytes)?.parts().len(), 2);
//! # Ok::<(), mailtree_mime::Error>(())
//! ```
//!
//! ### Encoded Words
//!
//! ```
//! use mailtree_mime::{EncodedWordContext, EncodedWordEncoder, decode_encoded_words};
//!
//! let encoded = EncodedWordEncoder::new().encode_unstructured("Héllo world");
//! assert_eq!(encoded, "=?utf-8?Q?H=C3=A9llo?= world");
//! assert_eq!(
//!     decode_encoded_words(&encoded, EncodedWordContext::Unstructured),
//!     "Héllo world"
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod message;
mod options;

pub mod charset;
pub mod encoding;
pub mod header;
pub mod rfc2047;
pub mod transform;

pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::Headers;
pub use header::address::{Address, NamedAddress};
pub use header::disposition::ContentDisposition;
pub use header::media_type::MediaType;
pub use message::Message;
pub use options::ParseOptions;
pub use rfc2047::{EncodedWordContext, EncodedWordEncoder, decode_encoded_words};
