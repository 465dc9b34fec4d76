//! MIME message parsing: subject extraction and a flattened part walk.

use mail_parser::{Message, MessageParser, MimeHeaders, PartType};

/// Read-only view over one raw message.
///
/// Borrows the raw-bytes buffer it was parsed from and is dropped as soon
/// as the message has been processed; payloads are written out immediately,
/// never accumulated.
pub struct ParsedMessage<'a> {
    inner: Message<'a>,
}

/// One node of the MIME tree.
///
/// `payload` is already decoded from any content-transfer-encoding and can
/// be written to disk as-is. Parts without a filename are yielded too; the
/// caller decides what to keep.
pub struct Part<'a> {
    pub filename: Option<&'a str>,
    pub payload: &'a [u8],
}

/// Parse raw message bytes.
///
/// Returns `None` when the bytes cannot be interpreted as a structured
/// mail message; the caller attaches the message identifier to that.
pub fn parse(raw: &[u8]) -> Option<ParsedMessage<'_>> {
    MessageParser::default()
        .parse(raw)
        .map(|inner| ParsedMessage { inner })
}

impl ParsedMessage<'_> {
    /// The decoded subject, or `""` when the header is absent.
    ///
    /// Sanitization happens at write time, not here, so this stays the true
    /// value for pattern matching.
    pub fn subject(&self) -> &str {
        self.inner.subject().unwrap_or("")
    }

    /// Every node of the MIME tree, flattened.
    ///
    /// Recurses into embedded `message/rfc822` messages: the embedded
    /// message is yielded as one part (payload = its raw bytes), then its
    /// own tree is walked. Multipart containers carry no payload and are
    /// skipped.
    pub fn parts(&self) -> Vec<Part<'_>> {
        let mut out = Vec::new();
        collect_parts(&self.inner, &mut out);
        out
    }
}

fn collect_parts<'a>(message: &'a Message<'a>, out: &mut Vec<Part<'a>>) {
    for part in &message.parts {
        if let PartType::Multipart(_) = part.body {
            continue;
        }

        out.push(Part {
            filename: part.attachment_name(),
            payload: part.contents(),
        });

        if let PartType::Message(nested) = &part.body {
            collect_parts(nested, out);
        }
    }
}
