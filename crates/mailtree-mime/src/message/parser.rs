//! Message parsing: header classification and the multipart walk.

use super::Message;
use crate::encoding::TransferEncoding;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::header::field;
use crate::header::media_type::{MediaType, is_valid_boundary};
use crate::header::semantics::without_cfws;
use crate::options::ParseOptions;
use crate::transform::{BoundaryChecker, StreamWithUnget, Transform, decoder_for};

/// Fields that may appear at most once in a header block.
const SINGLETON_FIELDS: &[&str] = &[
    "from",
    "sender",
    "reply-to",
    "to",
    "cc",
    "bcc",
    "subject",
    "date",
    "message-id",
    "content-type",
    "content-transfer-encoding",
    "mime-version",
];

/// Fields whose grammar failures abort the parse.
const STRICT_FIELDS: &[&str] = &["to", "cc", "bcc", "content-transfer-encoding"];

/// Whether a field may appear at most once.
pub(crate) fn is_singleton(name: &str) -> bool {
    SINGLETON_FIELDS.contains(&name)
}

/// What a header block says about the entity that follows it.
#[derive(Debug)]
pub(crate) struct Classified {
    pub(crate) content_type: MediaType,
    pub(crate) transfer_encoding: TransferEncoding,
    pub(crate) boundary: Option<String>,
}

/// Checks a header block and determines media type and transfer encoding.
///
/// `in_digest` selects `message/rfc822` as the default type.
pub(crate) fn classify(headers: &Headers, in_digest: bool) -> Result<Classified> {
    for name in SINGLETON_FIELDS {
        if headers.count(name) > 1 {
            return Err(Error::DuplicateHeader((*name).to_string()));
        }
    }

    for (name, value) in headers.iter() {
        let parser = field::parser_for(name);
        if STRICT_FIELDS.contains(&name) {
            if !value.trim().is_empty() && !parser.validate(value) {
                return Err(Error::invalid_header(
                    name,
                    format!("value does not match the field grammar: {value}"),
                ));
            }
        } else if name == "from" && !parser.validate(value) {
            // Tolerated: a malformed From does not abort the parse.
            tracing::warn!(value, "Malformed From field");
        }
    }

    let default_type = || {
        if in_digest {
            MediaType::message_rfc822()
        } else {
            MediaType::text_plain_ascii()
        }
    };
    let mut content_type = match headers.get("content-type") {
        None => default_type(),
        Some(value) => MediaType::parse(value).unwrap_or_else(|error| {
            tracing::warn!(%error, "Invalid Content-Type, using the default");
            default_type()
        }),
    };
    let transfer_encoding = headers
        .get("content-transfer-encoding")
        .map_or(TransferEncoding::SevenBit, |value| {
            TransferEncoding::parse(&without_cfws(value))
        });

    if transfer_encoding == TransferEncoding::Unknown {
        if content_type.is_multipart() || content_type.is_message() {
            return Err(Error::InvalidMediaType(format!(
                "{}/{} with an unknown transfer encoding",
                content_type.top_level_type(),
                content_type.sub_type()
            )));
        }
        tracing::debug!(
            media_type = %content_type,
            "Unknown transfer encoding, treating the body as application/octet-stream"
        );
        content_type = MediaType::application_octet_stream();
    }

    let mut boundary = None;
    if content_type.is_multipart() {
        if !transfer_encoding.is_identity() {
            return Err(Error::invalid_header(
                "content-transfer-encoding",
                format!("multipart entities cannot be {transfer_encoding}"),
            ));
        }
        match content_type.boundary() {
            Some(b) if is_valid_boundary(b) => boundary = Some(b.to_string()),
            Some(b) => return Err(Error::InvalidBoundary(format!("invalid boundary {b:?}"))),
            None => return Err(Error::InvalidBoundary("missing boundary parameter".into())),
        }
    }

    Ok(Classified {
        content_type,
        transfer_encoding,
        boundary,
    })
}

/// One entity of the part tree, before assembly.
struct Node {
    headers: Headers,
    content_type: MediaType,
    transfer_encoding: TransferEncoding,
    body: Option<Vec<u8>>,
    children: Vec<usize>,
}

impl Node {
    fn new(headers: Headers, classified: Classified) -> Self {
        Self {
            headers,
            content_type: classified.content_type,
            transfer_encoding: classified.transfer_encoding,
            body: None,
            children: Vec::new(),
        }
    }
}

/// Parses one message from a byte source.
pub(crate) fn parse_message<S: Transform>(source: S, options: &ParseOptions) -> Result<Message> {
    let mut source = StreamWithUnget::new(source);
    let headers = Headers::read(&mut source, options)?;
    let classified = classify(&headers, false)?;

    let Some(boundary) = classified.boundary.clone() else {
        let text_plain = classified.content_type.is("text", "plain");
        let body = decoder_for(
            &mut source,
            classified.transfer_encoding,
            text_plain,
            options,
        )
        .read_to_end()?;
        let mut node = Node::new(headers, classified);
        node.body = Some(body);
        return assemble(vec![node]);
    };

    let mut nodes = vec![Node::new(headers, classified)];
    let mut checker = BoundaryChecker::new(&mut source, boundary);
    // Multipart nodes, parallel to the checker's boundary stack.
    let mut stack = vec![0usize];

    // The preamble carries no content.
    checker.read_to_end()?;

    while !checker.is_finished() {
        if !checker.has_new_body_part() {
            return Err(Error::PrematureEnd("multipart body stopped without a delimiter".into()));
        }
        stack.truncate(checker.boundary_count());
        let parent = *stack
            .last()
            .ok_or_else(|| Error::PrematureEnd("body part outside any multipart".into()))?;

        checker.start_body_part_headers();
        let headers = Headers::read(checker.source_mut(), options)?;
        checker.end_body_part_headers();

        let in_digest = nodes[parent].content_type.is("multipart", "digest");
        let classified = classify(&headers, in_digest)?;
        let id = nodes.len();
        nodes[parent].children.push(id);
        tracing::trace!(
            part = id,
            parent,
            media_type = %classified.content_type,
            "Reading body part"
        );

        if let Some(boundary) = classified.boundary.clone() {
            nodes.push(Node::new(headers, classified));
            checker.push_boundary(boundary);
            stack.push(id);
            checker.read_to_end()?;
        } else {
            let text_plain = classified.content_type.is("text", "plain");
            let body = decoder_for(
                &mut checker,
                classified.transfer_encoding,
                text_plain,
                options,
            )
            .read_to_end()?;
            let mut node = Node::new(headers, classified);
            node.body = Some(body);
            nodes.push(node);
        }
    }

    assemble(nodes)
}

/// Builds the message tree from the arena. Children always have larger ids
/// than their parent, so a reverse pass finds them already built.
fn assemble(nodes: Vec<Node>) -> Result<Message> {
    let mut built: Vec<Option<Message>> = Vec::with_capacity(nodes.len());
    built.resize_with(nodes.len(), || None);
    for (id, node) in nodes.into_iter().enumerate().rev() {
        let parts = node
            .children
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[id] = Some(Message::from_parts(
            node.headers,
            node.content_type,
            node.transfer_encoding,
            node.body,
            parts,
        ));
    }
    built
        .into_iter()
        .next()
        .flatten()
        .ok_or_else(|| Error::PrematureEnd("empty message".into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(fields: &[(&str, &str)]) -> Headers {
        fields.iter().copied().collect()
    }

    #[test]
    fn test_classify_defaults() {
        let classified = classify(&Headers::new(), false).unwrap();
        assert_eq!(classified.content_type, MediaType::text_plain_ascii());
        assert_eq!(classified.transfer_encoding, TransferEncoding::SevenBit);

        let classified = classify(&Headers::new(), true).unwrap();
        assert_eq!(classified.content_type, MediaType::message_rfc822());
    }

    #[test]
    fn test_classify_duplicates() {
        let result = classify(&headers(&[("subject", "a"), ("subject", "b")]), false);
        assert!(matches!(result, Err(Error::DuplicateHeader(name)) if name == "subject"));
        assert!(classify(&headers(&[("received", "a"), ("received", "b")]), false).is_ok());
    }

    #[test]
    fn test_classify_address_fields() {
        assert!(matches!(
            classify(&headers(&[("to", "not an address")]), false),
            Err(Error::InvalidHeader { name, .. }) if name == "to"
        ));
        assert!(classify(&headers(&[("cc", "")]), false).is_ok());
        // A malformed From is only logged.
        assert!(classify(&headers(&[("from", "not an address")]), false).is_ok());
    }

    #[test]
    fn test_classify_invalid_content_type_falls_back() {
        let classified = classify(&headers(&[("content-type", "garbage")]), false).unwrap();
        assert_eq!(classified.content_type, MediaType::text_plain_ascii());
    }

    #[test]
    fn test_classify_unknown_encoding() {
        let classified = classify(
            &headers(&[
                ("content-type", "text/plain"),
                ("content-transfer-encoding", "x-uuencode"),
            ]),
            false,
        )
        .unwrap();
        assert_eq!(classified.transfer_encoding, TransferEncoding::Unknown);
        assert_eq!(classified.content_type, MediaType::application_octet_stream());

        let result = classify(
            &headers(&[
                ("content-type", "message/rfc822"),
                ("content-transfer-encoding", "x-uuencode"),
            ]),
            false,
        );
        assert!(matches!(result, Err(Error::InvalidMediaType(_))));
    }

    #[test]
    fn test_classify_multipart_rules() {
        assert!(matches!(
            classify(&headers(&[("content-type", "multipart/mixed")]), false),
            Err(Error::InvalidBoundary(_))
        ));
        assert!(matches!(
            classify(
                &headers(&[("content-type", "multipart/mixed; boundary=\"ends in space \"")]),
                false
            ),
            Err(Error::InvalidBoundary(_))
        ));
        assert!(matches!(
            classify(
                &headers(&[
                    ("content-type", "multipart/mixed; boundary=X"),
                    ("content-transfer-encoding", "base64"),
                ]),
                false
            ),
            Err(Error::InvalidHeader { .. })
        ));
        let classified =
            classify(&headers(&[("content-type", "multipart/mixed; boundary=X")]), false).unwrap();
        assert_eq!(classified.boundary.as_deref(), Some("X"));
    }

    #[test]
    fn test_digest_parts_default_to_message() {
        let data = b"Content-Type: multipart/digest; boundary=D\r\n\r\n\
            --D\r\n\r\nSubject: inner\r\n\r\nhello\r\n\
            --D--\r\n";
        let message = parse_message(crate::transform::SliceSource::new(data), &ParseOptions::default())
            .unwrap();
        let part = &message.parts()[0];
        assert!(part.content_type().is("message", "rfc822"));
        assert_eq!(part.body(), Some(&b"Subject: inner\r\n\r\nhello"[..]));
    }

    #[test]
    fn test_nested_multipart_tree() {
        let data = b"Content-Type: multipart/mixed; boundary=outer\r\n\r\n\
            preamble\r\n\
            --outer\r\n\
            Content-Type: multipart/alternative; boundary=inner\r\n\r\n\
            --inner\r\n\r\nplain\r\n\
            --inner\r\nContent-Type: text/html\r\n\r\n<p>html</p>\r\n\
            --inner--\r\n\
            --outer\r\nContent-Type: application/octet-stream\r\n\
            Content-Transfer-Encoding: base64\r\n\r\nAAEC\r\n\
            --outer--\r\nepilogue\r\n";
        let message = parse_message(crate::transform::SliceSource::new(data), &ParseOptions::default())
            .unwrap();
        assert_eq!(message.parts().len(), 2);
        let alternative = &message.parts()[0];
        assert!(alternative.content_type().is("multipart", "alternative"));
        assert_eq!(alternative.parts().len(), 2);
        assert_eq!(alternative.parts()[0].body(), Some(&b"plain"[..]));
        assert_eq!(alternative.parts()[1].body(), Some(&b"<p>html</p>"[..]));
        assert_eq!(message.parts()[1].body(), Some(&[0u8, 1, 2][..]));
    }
}
