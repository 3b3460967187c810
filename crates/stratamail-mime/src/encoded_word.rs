//! RFC 2047 encoded-word decoding for header text.
//!
//! Header values may contain runs of the form `=?charset?Q|B?payload?=`.
//! Whitespace that only separates two adjacent encoded-words is dropped,
//! while any other surrounding text is kept verbatim.

use crate::charset::Charset;
use crate::encoding::{QpMode, decode_base64, decode_quoted_printable_bytes};

/// Number of `?` characters in a complete word, terminator included.
const WORD_SEPARATORS: usize = 4;

/// Decodes every encoded-word in `input`.
///
/// Words that cannot be decoded (unknown charset, bad Base64, unknown
/// payload type) are passed through unchanged.
#[must_use]
pub fn decode_encoded_words(input: &str) -> String {
    if !input.contains("=?") {
        return input.to_string();
    }

    let mut output = String::with_capacity(input.len());
    let mut surrounding = String::new();
    let mut word = String::new();
    // Whitespace held back until the word after it is known to be complete.
    let mut gap = String::new();
    let mut in_word = false;
    let mut seen_word = false;
    let mut separators = 0;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_word {
            word.push(c);
            if c == '?' {
                separators += 1;
                if separators >= WORD_SEPARATORS && chars.peek() == Some(&'=') {
                    chars.next();
                    word.push('=');
                    output.push_str(&decode_word(&word));
                    word.clear();
                    gap.clear();
                    in_word = false;
                }
            }
        } else if c == '=' && chars.peek() == Some(&'?') {
            chars.next();
            if !seen_word || !surrounding.trim().is_empty() {
                output.push_str(&surrounding);
            } else {
                gap.push_str(&surrounding);
            }
            surrounding.clear();
            seen_word = true;
            in_word = true;
            separators = 1;
            word.push_str("=?");
        } else {
            surrounding.push(c);
        }
    }

    // An unterminated word is plain text after all.
    output.push_str(&gap);
    output.push_str(&word);
    output.push_str(&surrounding);
    output
}

/// Decodes one complete `=?charset?type?payload?=` word.
fn decode_word(word: &str) -> String {
    match try_decode_word(word) {
        Some(decoded) => decoded,
        None => {
            tracing::warn!(word, "leaving undecodable encoded-word as-is");
            word.to_string()
        }
    }
}

fn try_decode_word(word: &str) -> Option<String> {
    let inner = word.strip_prefix("=?")?.strip_suffix("?=")?;
    let mut parts = inner.splitn(3, '?');
    let charset_label = parts.next()?;
    let kind = parts.next()?;
    let payload = parts.next()?;

    // RFC 2231 allows a language suffix: `utf-8*en`.
    let charset_label = charset_label.split('*').next().unwrap_or_default();
    let charset = Charset::for_label(charset_label).ok()?;

    let bytes = match kind {
        "Q" | "q" => {
            let mut raw: Vec<u8> = payload
                .bytes()
                .map(|b| if b == b'_' { b' ' } else { b })
                .collect();
            raw.extend_from_slice(b"?=");
            decode_quoted_printable_bytes(&raw, QpMode::EncodedWord)
        }
        "B" | "b" => decode_base64(payload.as_bytes()).ok()?,
        _ => return None,
    };

    Some(charset.decode(&bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::encoding::encode_base64;
    use proptest::prelude::*;

    #[test]
    fn test_basic_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?a?="), "a");
    }

    #[test]
    fn test_unterminated_word_keeps_leading_space() {
        assert_eq!(decode_encoded_words("=?utf-8?Q?a?= =?broken"), "a =?broken");
        assert_eq!(decode_encoded_words("=?utf-8?Q?a?=\t=?x?Q"), "a\t=?x?Q");
    }

    #[test]
    fn test_surrounding_text_kept() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?a?= b"), "a b");
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?a?= some text =?ISO-8859-1?Q?b?="),
            "a some text b"
        );
        assert_eq!(decode_encoded_words("Re: =?ISO-8859-1?Q?a?="), "Re: a");
    }

    #[test]
    fn test_whitespace_between_words_elided() {
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?a?= =?ISO-8859-1?Q?b?="),
            "ab"
        );
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?a?=  =?ISO-8859-1?Q?b?="),
            "ab"
        );
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?a?= \t\r\n  =?ISO-8859-1?Q?b?="),
            "ab"
        );
    }

    #[test]
    fn test_underscores() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?a_b?="), "a b");
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?a?= =?ISO-8859-2?Q?_b?="),
            "a b"
        );
        assert_eq!(
            decode_encoded_words("snake_case =?ISO-8859-1?Q?a?="),
            "snake_case a"
        );
    }

    #[test]
    fn test_windows_1252_subject() {
        let encoded = "=?WINDOWS-1252?Q?Gmail=92s_=91People_Widget=92_Takes_On_Ra?= =?WINDOWS-1252?Q?pportive,_No_Browser_Plugin_Required?=";
        assert_eq!(
            decode_encoded_words(encoded),
            "Gmail\u{2019}s \u{2018}People Widget\u{2019} Takes On Rapportive, No Browser Plugin Required"
        );
    }

    #[test]
    fn test_plain_text_unchanged() {
        let text = "Another test...  ?=  ,   ;   =   ==    =2C";
        assert_eq!(decode_encoded_words(text), text);
    }

    #[test]
    fn test_equals_as_first_payload_character() {
        let encoded = "=?ISO-8859-1?Q?a?= =?ISO-8859-1?Q?=2C?= =?ISO-8859-2?Q?_b?= =?ISO-8859-1?Q?=3B=3D?= =?ISO-8859-2?Q?_c?=";
        assert_eq!(decode_encoded_words(encoded), "a, b;= c");
    }

    #[test]
    fn test_base64_word() {
        assert_eq!(decode_encoded_words("=?utf-8?B?5YiY5YWL5bOw?="), "刘克峰");
        assert_eq!(decode_encoded_words("=?UTF-8?b?aGk=?="), "hi");
    }

    #[test]
    fn test_terminator_needs_all_separators() {
        assert_eq!(decode_encoded_words("=?utf-8?Q?=41?="), "A");
        assert_eq!(decode_encoded_words("=?utf-8?Q?why=3F?="), "why?");
        assert_eq!(decode_encoded_words("=?utf-8?Q?really?="), "really");
    }

    #[test]
    fn test_empty_charset_is_ascii() {
        assert_eq!(decode_encoded_words("=??Q?plain?="), "plain");
    }

    #[test]
    fn test_undecodable_words_pass_through() {
        let unknown_charset = "=?x-bogus?Q?a?=";
        assert_eq!(decode_encoded_words(unknown_charset), unknown_charset);

        let bad_base64 = "=?utf-8?B?!!!?=";
        assert_eq!(decode_encoded_words(bad_base64), bad_base64);

        let bad_kind = "=?utf-8?X?abc?=";
        assert_eq!(decode_encoded_words(bad_kind), bad_kind);
    }

    #[test]
    fn test_unterminated_word_kept() {
        assert_eq!(decode_encoded_words("x =?utf-8?Q?abc"), "x =?utf-8?Q?abc");
    }

    proptest! {
        #[test]
        fn prop_base64_word_roundtrip(payload in "\\PC{0,40}") {
            let word = format!("=?utf-8?B?{}?=", encode_base64(payload.as_bytes()));
            prop_assert_eq!(decode_encoded_words(&word), payload);
        }
    }
}
