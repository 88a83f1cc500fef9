//! Per-field grammar selection.
//!
//! Every field name maps to a [`FieldParser`]. Fields with a grammar are
//! structured: their values are validated against it, and only the encoded
//! words in their phrases and comments are decoded. All other fields are
//! unstructured text.

use super::grammar::{self, Rule};
use super::semantics;
use crate::rfc2047::{EncodedWordContext, EncodedWordEncoder, decode_encoded_words};

/// Behavior of one kind of header field.
pub trait FieldParser: Sync {
    /// Whether values follow a grammar.
    fn is_structured(&self) -> bool;

    /// Whether `value` is acceptable for the field.
    fn validate(&self, value: &str) -> bool;

    /// Decodes the encoded words the field may carry.
    fn decode(&self, value: &str) -> String;

    /// Makes `value` ASCII-safe with encoded words.
    fn encode(&self, value: &str, encoder: &EncodedWordEncoder) -> String;
}

/// A field whose value matches a grammar production.
#[derive(Debug, Clone, Copy)]
pub struct Structured {
    rule: Rule,
}

impl Structured {
    /// Wraps a production.
    #[must_use]
    pub const fn new(rule: Rule) -> Self {
        Self { rule }
    }

    /// The production the value must match.
    #[must_use]
    pub const fn rule(&self) -> Rule {
        self.rule
    }
}

impl FieldParser for Structured {
    fn is_structured(&self) -> bool {
        true
    }

    fn validate(&self, value: &str) -> bool {
        grammar::matches(value, self.rule)
    }

    fn decode(&self, value: &str) -> String {
        semantics::decode_structured(value, self.rule)
    }

    fn encode(&self, value: &str, encoder: &EncodedWordEncoder) -> String {
        semantics::encode_structured(value, self.rule, encoder)
    }
}

/// Free text such as `Subject`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unstructured;

impl FieldParser for Unstructured {
    fn is_structured(&self) -> bool {
        false
    }

    fn validate(&self, _value: &str) -> bool {
        true
    }

    fn decode(&self, value: &str) -> String {
        decode_encoded_words(value, EncodedWordContext::Unstructured)
    }

    fn encode(&self, value: &str, encoder: &EncodedWordEncoder) -> String {
        encoder.encode_unstructured(value)
    }
}

static MAILBOX: Structured = Structured::new(grammar::mailbox);
static MAILBOX_LIST: Structured = Structured::new(grammar::mailbox_list);
static ADDRESS_LIST: Structured = Structured::new(grammar::address_list_field);
static MSG_ID: Structured = Structured::new(grammar::msg_id);
static MSG_ID_LIST: Structured = Structured::new(grammar::msg_id_list);
static DATE_TIME: Structured = Structured::new(grammar::date_time);
static KEYWORDS: Structured = Structured::new(grammar::keywords);
static MIME_VERSION: Structured = Structured::new(grammar::mime_version);
static CONTENT_TYPE: Structured = Structured::new(grammar::content_type);
static CONTENT_DISPOSITION: Structured = Structured::new(grammar::content_disposition);
static CONTENT_TRANSFER_ENCODING: Structured =
    Structured::new(grammar::content_transfer_encoding);
static AUTHENTICATION_RESULTS: Structured = Structured::new(grammar::authentication_results);
static DKIM_SIGNATURE: Structured = Structured::new(grammar::dkim_tag_list);
static UNSTRUCTURED: Unstructured = Unstructured;

/// The parser for a field name, matched case-insensitively.
#[must_use]
pub fn parser_for(name: &str) -> &'static dyn FieldParser {
    match name.to_ascii_lowercase().as_str() {
        "sender" | "resent-sender" => &MAILBOX,
        "from" | "resent-from" => &MAILBOX_LIST,
        "to" | "cc" | "bcc" | "reply-to" | "resent-to" | "resent-cc" | "resent-bcc" => {
            &ADDRESS_LIST
        }
        "message-id" | "resent-message-id" | "content-id" => &MSG_ID,
        "in-reply-to" | "references" => &MSG_ID_LIST,
        "date" | "resent-date" => &DATE_TIME,
        "keywords" => &KEYWORDS,
        "mime-version" => &MIME_VERSION,
        "content-type" => &CONTENT_TYPE,
        "content-disposition" => &CONTENT_DISPOSITION,
        "content-transfer-encoding" => &CONTENT_TRANSFER_ENCODING,
        "authentication-results" => &AUTHENTICATION_RESULTS,
        "dkim-signature" => &DKIM_SIGNATURE,
        _ => &UNSTRUCTURED,
    }
}

/// Whether the named field has a grammar.
#[must_use]
pub fn is_structured(name: &str) -> bool {
    parser_for(name).is_structured()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        assert!(is_structured("To"));
        assert!(is_structured("DKIM-Signature"));
        assert!(!is_structured("Subject"));
        assert!(!is_structured("X-Mailer"));
    }

    #[test]
    fn test_validate() {
        assert!(parser_for("to").validate("a@b.c, d@e.f"));
        assert!(!parser_for("to").validate("a@"));
        assert!(parser_for("message-id").validate("<1234@local.machine.example>"));
        assert!(parser_for("mime-version").validate("1.0 (produced by MetaSend)"));
        assert!(parser_for("x-anything").validate("whatever (unbalanced"));
    }

    #[test]
    fn test_decode_by_kind() {
        assert_eq!(
            parser_for("subject").decode("=?iso-8859-1?q?caf=E9?= time"),
            "café time"
        );
        assert_eq!(
            parser_for("from").decode("=?utf-8?q?Andr=C3=A9?= <a@b.c>"),
            "André <a@b.c>"
        );
        // An encoded word inside a quoted string is not decoded.
        assert_eq!(
            parser_for("from").decode("\"=?utf-8?q?x?=\" <a@b.c>"),
            "\"=?utf-8?q?x?=\" <a@b.c>"
        );
    }

    #[test]
    fn test_encode_by_kind() {
        let encoder = EncodedWordEncoder::new();
        assert_eq!(
            parser_for("subject").encode("Grüße aus Köln", &encoder),
            "=?utf-8?Q?Gr=C3=BC=C3=9Fe?= aus =?utf-8?Q?K=C3=B6ln?="
        );
        assert!(parser_for("to").encode("Zoë <z@example.com>", &encoder).is_ascii());
    }
}
