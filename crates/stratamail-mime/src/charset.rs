//! Charset lookup and byte-to-text conversion.
//!
//! Labels are resolved through the WHATWG encoding registry, so aliases such
//! as `latin1`, `cp1252` or `utf8` are accepted alongside the canonical names.
//! An empty label selects the 7-bit US-ASCII codec.

use std::fmt;

use encoding_rs::Encoding;

use crate::error::{Error, Result};

/// A character set that bytes can be decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// 7-bit US-ASCII. Bytes above `0x7F` decode to `?`.
    #[default]
    Ascii,
    /// Any charset known to the encoding registry.
    Labeled(&'static Encoding),
}

impl Charset {
    /// Looks up a charset by label.
    ///
    /// Surrounding whitespace and double quotes are ignored. An empty label
    /// yields [`Charset::Ascii`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCharset`] if the label is not recognised.
    pub fn for_label(label: &str) -> Result<Self> {
        let label = label.trim().trim_matches('"').trim();
        if label.is_empty()
            || label.eq_ignore_ascii_case("us-ascii")
            || label.eq_ignore_ascii_case("ascii")
        {
            return Ok(Self::Ascii);
        }

        Encoding::for_label(label.as_bytes())
            .map(Self::Labeled)
            .ok_or_else(|| Error::UnknownCharset(label.to_string()))
    }

    /// Looks up a charset, falling back to ASCII for unknown labels.
    #[must_use]
    pub fn for_label_or_ascii(label: &str) -> Self {
        Self::for_label(label).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to 7-bit charset");
            Self::Ascii
        })
    }

    /// Decodes bytes into text.
    ///
    /// Malformed sequences are replaced rather than rejected.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
                .collect(),
            Self::Labeled(encoding) => {
                let (text, _, _) = encoding.decode(bytes);
                text.into_owned()
            }
        }
    }

    /// Returns the canonical name of the charset.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ascii => "US-ASCII",
            Self::Labeled(encoding) => encoding.name(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_label_is_ascii() {
        assert_eq!(Charset::for_label("").unwrap(), Charset::Ascii);
        assert_eq!(Charset::for_label("  ").unwrap(), Charset::Ascii);
        assert_eq!(Charset::for_label("US-ASCII").unwrap(), Charset::Ascii);
    }

    #[test]
    fn test_label_aliases() {
        let latin1 = Charset::for_label("ISO-8859-1").unwrap();
        assert_eq!(latin1.decode(&[0x61, 0xE9]), "aé");

        let quoted = Charset::for_label("\"utf-8\"").unwrap();
        assert_eq!(quoted.name(), "UTF-8");
    }

    #[test]
    fn test_unknown_label() {
        assert!(matches!(
            Charset::for_label("x-no-such-charset"),
            Err(Error::UnknownCharset(_))
        ));
        assert_eq!(Charset::for_label_or_ascii("x-no-such-charset"), Charset::Ascii);
    }

    #[test]
    fn test_ascii_replaces_high_bytes() {
        assert_eq!(Charset::Ascii.decode(b"ok\xFF"), "ok?");
    }

    #[test]
    fn test_windows_1252_quotes() {
        let cp = Charset::for_label("WINDOWS-1252").unwrap();
        assert_eq!(cp.decode(&[0x91, 0x61, 0x92]), "\u{2018}a\u{2019}");
    }
}
