//! Content transfer decodings.
//!
//! Supports Base64, Quoted-Printable and the identity encodings used for
//! section payloads.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::charset::Charset;
use crate::error::Result;

/// Decodes Base64 data.
///
/// ASCII whitespace (including line breaks inside a body) is ignored.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact).map_err(Into::into)
}

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// How a quoted-printable scan treats the `?=` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QpMode {
    /// Body text: `?` is an ordinary byte.
    #[default]
    Body,
    /// Encoded-word payload: `?=` closes the word and is swallowed.
    EncodedWord,
}

/// Decodes quoted-printable bytes (RFC 2045).
///
/// `=XX` becomes the byte `0xXX`. An `=` followed by a line break is a soft
/// line break and produces nothing. Any other `=` is kept as-is, so the
/// decoder never fails.
#[must_use]
pub fn decode_quoted_printable_bytes(input: &[u8], mode: QpMode) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        match input[pos] {
            b'=' => {
                let line_breaks = input[pos + 1..]
                    .iter()
                    .take(2)
                    .take_while(|&&b| b == b'\r' || b == b'\n')
                    .count();
                if line_breaks > 0 {
                    pos += 1 + line_breaks;
                } else if let Some(byte) = hex_byte(input.get(pos + 1..pos + 3)) {
                    output.push(byte);
                    pos += 3;
                } else {
                    output.push(b'=');
                    pos += 1;
                }
            }
            b'?' if mode == QpMode::EncodedWord && input.get(pos + 1) == Some(&b'=') => {
                pos += 2;
            }
            byte => {
                output.push(byte);
                pos += 1;
            }
        }
    }

    output
}

/// Decodes quoted-printable text and interprets the bytes with `charset`.
#[must_use]
pub fn decode_quoted_printable(text: &str, charset: Charset) -> String {
    charset.decode(&decode_quoted_printable_bytes(text.as_bytes(), QpMode::Body))
}

fn hex_byte(pair: Option<&[u8]>) -> Option<u8> {
    let pair = std::str::from_utf8(pair?).ok()?;
    if !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(pair, 16).ok()
}

/// Content-Transfer-Encoding of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit data.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a transfer encoding name, ignoring case.
    ///
    /// Returns `None` for encodings this crate cannot decode.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7bit" => Some(Self::SevenBit),
            "8bit" => Some(Self::EightBit),
            "base64" => Some(Self::Base64),
            "quoted-printable" => Some(Self::QuotedPrintable),
            "binary" => Some(Self::Binary),
            _ => None,
        }
    }

    /// Decodes a payload transferred with this encoding.
    ///
    /// Returns `None` when a Base64 payload is malformed.
    #[must_use]
    pub fn decode(self, payload: &[u8]) -> Option<Vec<u8>> {
        match self {
            Self::SevenBit | Self::EightBit | Self::Binary => Some(payload.to_vec()),
            Self::QuotedPrintable => Some(decode_quoted_printable_bytes(payload, QpMode::Body)),
            Self::Base64 => decode_base64(payload)
                .inspect_err(|e| tracing::warn!(error = %e, "discarding malformed base64 payload"))
                .ok(),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn utf8() -> Charset {
        Charset::for_label("utf-8").unwrap()
    }

    #[test]
    fn test_base64_decode() {
        assert_eq!(decode_base64(b"SGVsbG8sIFdvcmxkIQ==").unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_base64_ignores_line_breaks() {
        assert_eq!(decode_base64(b"SGVs\r\nbG8s\r\nIFdvcmxkIQ==").unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_base64_invalid() {
        assert!(decode_base64(b"not base64!").is_err());
    }

    #[test]
    fn test_quoted_printable_escapes() {
        let decoded = decode_quoted_printable(
            "Another test...  ?=3D  =2C   =3B   =3D   =3D=3D    =3D2C",
            utf8(),
        );
        assert_eq!(decoded, "Another test...  ?=  ,   ;   =   ==    =2C");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let decoded = decode_quoted_printable(
            "Another test...  =\r\nThis should not be on a new line.",
            utf8(),
        );
        assert_eq!(decoded, "Another test...  This should not be on a new line.");

        assert_eq!(decode_quoted_printable("a=\nb", utf8()), "ab");
    }

    #[test]
    fn test_quoted_printable_unresolved_equals_kept() {
        assert_eq!(decode_quoted_printable("=This", utf8()), "=This");
        assert_eq!(decode_quoted_printable("ends with =", utf8()), "ends with =");
        assert_eq!(decode_quoted_printable("x=4", utf8()), "x=4");
        assert_eq!(decode_quoted_printable("=+1", utf8()), "=+1");
    }

    #[test]
    fn test_quoted_printable_multibyte() {
        assert_eq!(decode_quoted_printable("We=E2=80=99re", utf8()), "We\u{2019}re");
    }

    #[test]
    fn test_quoted_printable_encoded_word_mode() {
        assert_eq!(decode_quoted_printable_bytes(b"a=2Cb?=", QpMode::EncodedWord), b"a,b");
        assert_eq!(decode_quoted_printable_bytes(b"a=2Cb?=", QpMode::Body), b"a,b?=");
        assert_eq!(decode_quoted_printable_bytes(b"why?", QpMode::EncodedWord), b"why?");
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("BASE64"), Some(TransferEncoding::Base64));
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            Some(TransferEncoding::QuotedPrintable)
        );
        assert_eq!(TransferEncoding::parse("7BIT"), Some(TransferEncoding::SevenBit));
        assert_eq!(TransferEncoding::parse("x-uuencode"), None);
    }

    #[test]
    fn test_transfer_encoding_decode() {
        assert_eq!(
            TransferEncoding::Base64.decode(b"aGk=").unwrap(),
            b"hi".to_vec()
        );
        assert_eq!(TransferEncoding::Base64.decode(b"%%%"), None);
        assert_eq!(
            TransferEncoding::QuotedPrintable.decode(b"caf=C3=A9").unwrap(),
            "café".as_bytes().to_vec()
        );
        assert_eq!(TransferEncoding::Binary.decode(b"\x00\x01").unwrap(), vec![0, 1]);
    }

    proptest! {
        #[test]
        fn prop_base64_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(decode_base64(encode_base64(&data).as_bytes()).unwrap(), data);
        }

        #[test]
        fn prop_quoted_printable_plain_text_unchanged(text in "[a-zA-Z0-9 ,.;:!]{0,64}") {
            prop_assert_eq!(decode_quoted_printable(&text, Charset::Ascii), text);
        }
    }
}
