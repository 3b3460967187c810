//! Batching and section payload decoding for fetches.
//!
//! Large mailboxes are fetched in bounded batches so that no single response
//! grows without limit. [`uid_batches`] splits a UID list, [`range_batches`]
//! splits sequence numbers `1..=exists`.

use stratamail_mime::Charset;

use crate::types::{BodyPart, SequenceRange};

/// Default number of messages per fetch batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Splits a sorted UID list into ranges of at most `batch_size` UIDs.
///
/// Each range runs from the first to the last UID of its chunk, so gaps in
/// the list are covered by the range. A `batch_size` of 0 is treated as 1.
#[must_use]
pub fn uid_batches(uids: &[u64], batch_size: usize) -> Vec<SequenceRange> {
    uids.chunks(batch_size.max(1))
        .filter_map(|chunk| match chunk {
            [first, .., last] => Some(SequenceRange::new(*first, *last)),
            [only] => Some(SequenceRange::single(*only)),
            [] => None,
        })
        .collect()
}

/// Splits sequence numbers `1..=total` into ranges of at most `batch_size`.
#[must_use]
pub fn range_batches(total: u64, batch_size: usize) -> Vec<SequenceRange> {
    let batch_size = u64::try_from(batch_size.max(1)).unwrap_or(u64::MAX);
    let mut batches = Vec::new();
    let mut start = 1u64;

    while start <= total {
        let end = start.saturating_add(batch_size - 1).min(total);
        batches.push(SequenceRange::new(start, end));
        start = end + 1;
    }

    batches
}

/// Decoded content of one body section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPayload {
    /// The part declares a charset; its bytes were decoded to text.
    Text(String),
    /// No charset; raw decoded bytes.
    Binary(Vec<u8>),
}

impl SectionPayload {
    /// Decodes a section fetched for `part`.
    ///
    /// The transfer encoding is undone first. Returns `None` for an encoding
    /// this library does not know and for malformed Base64. A part with a
    /// `charset` parameter yields text, falling back to ASCII when the charset
    /// is unknown.
    #[must_use]
    pub fn decode(part: &BodyPart, raw: &[u8]) -> Option<Self> {
        let Some(encoding) = part.transfer_encoding() else {
            tracing::debug!(
                section = %part.section,
                encoding = %part.encoding,
                "unsupported transfer encoding, no payload"
            );
            return None;
        };
        let bytes = encoding.decode(raw)?;

        Some(match part.charset() {
            Some(label) => Self::Text(Charset::for_label_or_ascii(label).decode(&bytes)),
            None => Self::Binary(bytes),
        })
    }

    /// The text, if the payload is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// The payload as bytes; text is returned as UTF-8.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use stratamail_mime::ContentType;

    use super::*;

    fn part(content_type: ContentType, encoding: &str) -> BodyPart {
        BodyPart {
            section: "1".to_string(),
            content_type,
            content_id: None,
            description: None,
            encoding: encoding.to_string(),
            size: None,
        }
    }

    #[test]
    fn test_uid_batches() {
        let uids: Vec<u64> = vec![3, 4, 9, 10, 11, 40, 41];
        let batches = uid_batches(&uids, 3);
        assert_eq!(
            batches,
            vec![
                SequenceRange::new(3, 9),
                SequenceRange::new(10, 40),
                SequenceRange::single(41),
            ]
        );
        assert!(uid_batches(&[], 10).is_empty());
        assert_eq!(uid_batches(&[5, 6], 0).len(), 2);
    }

    #[test]
    fn test_uid_batches_default_size() {
        let uids: Vec<u64> = (1..=2500).collect();
        let batches = uid_batches(&uids, DEFAULT_BATCH_SIZE);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], SequenceRange::new(1, 1000));
        assert_eq!(batches[2], SequenceRange::new(2001, 2500));
    }

    #[test]
    fn test_range_batches() {
        assert_eq!(
            range_batches(250, 100),
            vec![
                SequenceRange::new(1, 100),
                SequenceRange::new(101, 200),
                SequenceRange::new(201, 250),
            ]
        );
        assert!(range_batches(0, 100).is_empty());
        assert_eq!(range_batches(1, 100), vec![SequenceRange::single(1)]);
    }

    #[test]
    fn test_decode_text_part() {
        let text = part(
            ContentType::new("text", "plain").with_parameter("charset", "\"iso-8859-1\""),
            "QUOTED-PRINTABLE",
        );
        let payload = SectionPayload::decode(&text, b"Caf=E9 =\r\nau lait").unwrap();
        assert_eq!(payload, SectionPayload::Text("Café au lait".to_string()));
        assert_eq!(payload.as_text(), Some("Café au lait"));
    }

    #[test]
    fn test_decode_binary_part() {
        let image = part(ContentType::new("image", "png"), "base64");
        let payload = SectionPayload::decode(&image, b"iVBO\r\nRw==").unwrap();
        assert_eq!(payload, SectionPayload::Binary(vec![0x89, 0x50, 0x4e, 0x47]));
        assert_eq!(payload.as_bytes(), &[0x89, 0x50, 0x4e, 0x47]);
    }

    #[test]
    fn test_unknown_charset_falls_back_to_ascii() {
        let text = part(
            ContentType::new("text", "plain").with_parameter("charset", "x-klingon"),
            "8bit",
        );
        let payload = SectionPayload::decode(&text, b"ok \xe9").unwrap();
        assert_eq!(payload, SectionPayload::Text("ok ?".to_string()));
    }

    #[test]
    fn test_no_payload_for_unknown_encoding_or_bad_base64() {
        let odd = part(ContentType::new("text", "plain"), "x-uuencode");
        assert!(SectionPayload::decode(&odd, b"begin 644").is_none());

        let broken = part(ContentType::new("application", "pdf"), "BASE64");
        assert!(SectionPayload::decode(&broken, b"!!!not base64!!!").is_none());
    }
}
