//! Reassembly of logical lines from transport lines.
//!
//! Servers may hard-wrap a single response line. A transport line is glued
//! onto the previous one while parentheses or quotes are still open, or
//! when it does not start with `*`, `+` or the command tag. The second rule
//! is a heuristic: an untagged server line with some other first character
//! would be merged too.

use std::mem;

/// Parses the length of a literal signal (`... {n}` at end of line).
///
/// Non-synchronizing literals (`{n+}`) are accepted as well.
#[must_use]
pub fn literal_length(line: &str) -> Option<usize> {
    let body = line.strip_suffix('}')?;
    let open = body.rfind('{')?;
    let digits = &body[open + 1..];
    let digits = digits.strip_suffix('+').unwrap_or(digits);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Merges wrapped transport lines into logical lines.
///
/// The entry after a literal signal is the literal payload and is passed
/// through verbatim as its own line.
#[must_use]
pub fn recombine(tag: &str, raw_lines: &[String]) -> Vec<String> {
    let mut logical = Vec::new();
    let mut accumulated = String::new();
    let mut nesting = Nesting::default();
    let mut literal_pending = false;

    for line in raw_lines {
        if literal_pending {
            logical.push(mem::take(&mut accumulated));
            logical.push(line.clone());
            literal_pending = false;
            continue;
        }

        if !nesting.is_balanced() || !starts_response(line, tag) {
            accumulated.push_str(line);
        } else {
            if !accumulated.is_empty() {
                logical.push(mem::take(&mut accumulated));
            }
            nesting = Nesting::default();
            accumulated.push_str(line);
        }

        literal_pending = literal_length(line).is_some();
        nesting.update(line);
    }

    if !accumulated.is_empty() {
        logical.push(accumulated);
    }

    logical
}

fn starts_response(line: &str, tag: &str) -> bool {
    line.starts_with('*') || line.starts_with('+') || line.starts_with(tag)
}

/// Quote and parenthesis state of the line being accumulated.
#[derive(Debug, Default)]
struct Nesting {
    quoted: bool,
    escaped: bool,
    open: usize,
    close: usize,
}

impl Nesting {
    const fn is_balanced(&self) -> bool {
        !self.quoted && self.open == self.close
    }

    fn update(&mut self, line: &str) {
        for c in line.chars() {
            if self.escaped {
                self.escaped = false;
                continue;
            }
            match c {
                '\\' if self.quoted => self.escaped = true,
                '"' => self.quoted = !self.quoted,
                '(' if !self.quoted => self.open += 1,
                ')' if !self.quoted => self.close += 1,
                _ => {}
            }
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
    use super::*;
    use proptest::prelude::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length("* 12 FETCH (BODY[1] {5}"), Some(5));
        assert_eq!(literal_length("BODY {123+}"), Some(123));
        assert_eq!(literal_length("{0}"), Some(0));
        assert_eq!(literal_length("no literal"), None);
        assert_eq!(literal_length("incomplete {123"), None);
        assert_eq!(literal_length("wrong {abc}"), None);
        assert_eq!(literal_length("empty {}"), None);
        assert_eq!(literal_length("}"), None);
    }

    #[test]
    fn test_complete_lines_untouched() {
        let raw = lines(&["* CAPABILITY IMAP4rev1", "* OK ready", "3 OK done"]);
        assert_eq!(recombine("3", &raw), raw);
    }

    #[test]
    fn test_unbalanced_parens_merge() {
        let raw = lines(&["* 1 FETCH (UID 5 FLAGS (\\Seen", ") BODY (1))", "3 OK done"]);
        assert_eq!(
            recombine("3", &raw),
            lines(&["* 1 FETCH (UID 5 FLAGS (\\Seen) BODY (1))", "3 OK done"])
        );
    }

    #[test]
    fn test_open_quote_merges_protocol_prefix() {
        let raw = lines(&["* 1 FETCH (X \"quoted", "* not a new line\")", "3 OK"]);
        assert_eq!(
            recombine("3", &raw),
            lines(&["* 1 FETCH (X \"quoted* not a new line\")", "3 OK"])
        );
    }

    #[test]
    fn test_escaped_quote_does_not_toggle() {
        let raw = lines(&["* 1 FETCH (X \"a \\\" b", "\")", "3 OK"]);
        assert_eq!(
            recombine("3", &raw),
            lines(&["* 1 FETCH (X \"a \\\" b\")", "3 OK"])
        );
    }

    #[test]
    fn test_non_protocol_prefix_merges() {
        let raw = lines(&["* LIST () \"/\" INBOX", "continued", "3 OK"]);
        assert_eq!(
            recombine("3", &raw),
            lines(&["* LIST () \"/\" INBOXcontinued", "3 OK"])
        );
    }

    #[test]
    fn test_literal_payload_verbatim() {
        let raw = lines(&["* 12 FETCH (BODY[1] {5}", "a)\"(b", ")", "3 OK done"]);
        assert_eq!(
            recombine("3", &raw),
            lines(&["* 12 FETCH (BODY[1] {5}", "a)\"(b", ")", "3 OK done"])
        );
    }

    #[test]
    fn test_literal_payload_with_protocol_prefix() {
        let raw = lines(&["* 1 FETCH (BODY[] {4}", "* ok", ")", "3 OK"]);
        assert_eq!(recombine("3", &raw), raw);
    }

    proptest! {
        #[test]
        fn prop_split_line_reassembles(
            words in proptest::collection::vec("[a-z]{1,6}", 1..8),
            quoted in "[a-z()* ]{0,12}",
            cuts in proptest::collection::vec(1usize..200, 0..6),
        ) {
            let line = format!(
                "* 4 FETCH (UID 9 X-WORDS ({}) X-QUOTED \"{}\")",
                words.join(" "),
                quoted
            );

            let mut cuts: Vec<usize> = cuts.into_iter().filter(|&c| c < line.len()).collect();
            cuts.sort_unstable();
            cuts.dedup();

            let mut raw = Vec::new();
            let mut start = 0;
            for cut in cuts {
                raw.push(line[start..cut].to_string());
                start = cut;
            }
            raw.push(line[start..].to_string());
            raw.push("A1 OK done".to_string());

            let logical = recombine("A1", &raw);
            prop_assert_eq!(logical, vec![line, "A1 OK done".to_string()]);
        }
    }
}
