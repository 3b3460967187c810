//! Command responses.
//!
//! A [`Response`] is everything the server sent for one tagged command: the
//! untagged data lines, the tagged completion line and its status. Lines are
//! logical lines, i.e. transport fragments have already been recombined and
//! literal payloads stand as their own entries.

mod framer;
mod recombine;

use std::fmt;

pub use framer::read_response;
pub use recombine::{literal_length, recombine};

/// Completion status of a tagged command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command was rejected; a normal negative outcome.
    No,
    /// Command was malformed or not understood.
    Bad,
}

impl Status {
    /// Parses a status word, ignoring case.
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("OK") {
            Some(Self::Ok)
        } else if word.eq_ignore_ascii_case("NO") {
            Some(Self::No)
        } else if word.eq_ignore_ascii_case("BAD") {
            Some(Self::Bad)
        } else {
            None
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::No => f.write_str("NO"),
            Self::Bad => f.write_str("BAD"),
        }
    }
}

/// One complete command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Completion status from the tagged line.
    pub status: Status,
    /// Logical lines, tagged completion line last.
    pub lines: Vec<String>,
    tag: String,
    raw_literals: Vec<Vec<u8>>,
}

impl Response {
    /// Creates a response from already recombined lines.
    #[must_use]
    pub fn new(tag: impl Into<String>, status: Status, lines: Vec<String>) -> Self {
        Self {
            status,
            lines,
            tag: tag.into(),
            raw_literals: Vec::new(),
        }
    }

    /// Attaches the exact bytes of each literal payload, in arrival order.
    #[must_use]
    pub fn with_raw_literals(mut self, raw_literals: Vec<Vec<u8>>) -> Self {
        self.raw_literals = raw_literals;
        self
    }

    /// The tag of the command this response answers.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns true for an OK completion.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok)
    }

    /// Returns true for a NO completion.
    #[must_use]
    pub const fn is_no(&self) -> bool {
        matches!(self.status, Status::No)
    }

    /// Returns true for a BAD completion.
    #[must_use]
    pub const fn is_bad(&self) -> bool {
        matches!(self.status, Status::Bad)
    }

    /// Human-readable text of the tagged completion line.
    #[must_use]
    pub fn text(&self) -> &str {
        let Some(last) = self.lines.last() else {
            return "";
        };
        let Some(rest) = last
            .strip_prefix(self.tag.as_str())
            .and_then(|rest| rest.strip_prefix(' '))
        else {
            return "";
        };
        rest.split_once(' ').map_or("", |(_, text)| text.trim())
    }

    /// Returns the logical lines with every literal spliced back inline.
    ///
    /// A literal signal line, its payload and the line continuing after the
    /// payload become a single line in which the payload is a quoted string.
    /// This is the view to parse when a literal may stand in for a field
    /// value, for example a subject inside an envelope.
    #[must_use]
    pub fn inline_literals(&self) -> Vec<String> {
        let mut inlined = Vec::with_capacity(self.lines.len());
        let mut entries = self.lines.iter();

        while let Some(entry) = entries.next() {
            let mut line = entry.clone();
            while let Some(signal_start) = literal_signal_start(&line) {
                let Some(payload) = entries.next() else {
                    break;
                };
                line.truncate(signal_start);
                push_quoted(&mut line, payload);

                match entries.as_slice().first() {
                    Some(rest) if !self.starts_new_response(rest) => {
                        line.push_str(rest);
                        entries.next();
                    }
                    _ => break,
                }
            }
            inlined.push(line);
        }

        inlined
    }

    /// Returns each literal payload with the signal line that announced it.
    ///
    /// Payload bytes are exact when the response came off the wire; for a
    /// response built from text only they are the payload entry's UTF-8.
    #[must_use]
    pub fn literals(&self) -> Vec<(&str, &[u8])> {
        let mut found = Vec::new();
        let mut raw = self.raw_literals.iter();
        let mut entries = self.lines.iter();

        while let Some(entry) = entries.next() {
            if literal_length(entry).is_none() {
                continue;
            }
            let Some(payload) = entries.next() else {
                break;
            };
            let bytes = raw.next().map_or(payload.as_bytes(), Vec::as_slice);
            found.push((entry.as_str(), bytes));
        }

        found
    }

    fn starts_new_response(&self, line: &str) -> bool {
        line.starts_with('*') || line.starts_with('+') || line.starts_with(self.tag.as_str())
    }
}

/// Byte offset of the `{n}` suffix of a literal signal line.
fn literal_signal_start(line: &str) -> Option<usize> {
    literal_length(line)?;
    line.rfind('{')
}

/// Appends `text` as an IMAP quoted string.
fn push_quoted(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
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

    fn response(lines: &[&str]) -> Response {
        Response::new(
            "7",
            Status::Ok,
            lines.iter().map(ToString::to_string).collect(),
        )
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(Status::parse("OK"), Some(Status::Ok));
        assert_eq!(Status::parse("no"), Some(Status::No));
        assert_eq!(Status::parse("Bad"), Some(Status::Bad));
        assert_eq!(Status::parse("BYE"), None);
    }

    #[test]
    fn test_text() {
        let resp = response(&["* 3 EXISTS", "7 OK [READ-WRITE] SELECT completed"]);
        assert_eq!(resp.text(), "[READ-WRITE] SELECT completed");
        assert!(resp.is_ok());
        assert!(!resp.is_no());

        assert_eq!(response(&["7 OK"]).text(), "");
        assert_eq!(response(&[]).text(), "");
    }

    #[test]
    fn test_inline_literals() {
        let resp = response(&[
            "* 1 FETCH (UID 10 ENVELOPE (NIL {11}",
            "Hi \"there\"",
            " NIL))",
            "7 OK done",
        ]);
        assert_eq!(
            resp.inline_literals(),
            vec![
                "* 1 FETCH (UID 10 ENVELOPE (NIL \"Hi \\\"there\\\"\" NIL))".to_string(),
                "7 OK done".to_string(),
            ]
        );
    }

    #[test]
    fn test_inline_consecutive_literals() {
        let resp = response(&[
            "* 2 FETCH (ENVELOPE (NIL {1}",
            "a",
            " {1}",
            "b",
            "))",
            "7 OK done",
        ]);
        assert_eq!(
            resp.inline_literals(),
            vec![
                "* 2 FETCH (ENVELOPE (NIL \"a\" \"b\"))".to_string(),
                "7 OK done".to_string(),
            ]
        );
    }

    #[test]
    fn test_inline_stops_at_next_response() {
        let resp = response(&["* 3 FETCH (BODY[1] {3}", "abc", "* 4 FETCH (UID 9)", "7 OK"]);
        let inlined = resp.inline_literals();
        assert_eq!(inlined[0], "* 3 FETCH (BODY[1] \"abc\"");
        assert_eq!(inlined[1], "* 4 FETCH (UID 9)");
        assert_eq!(inlined.len(), 3);
    }

    #[test]
    fn test_literals_without_raw_bytes() {
        let resp = response(&["* 2 FETCH (ENVELOPE (NIL {1}", "a", " {1}", "b", "))", "7 OK done"]);
        let literals = resp.literals();
        assert_eq!(literals.len(), 2);
        assert_eq!(literals[0], ("* 2 FETCH (ENVELOPE (NIL {1}", b"a".as_slice()));
        assert_eq!(literals[1], (" {1}", b"b".as_slice()));
    }

    #[test]
    fn test_literals_prefer_raw_bytes() {
        let resp = response(&["* 1 FETCH (BODY[1] {2}", "\u{fffd}z", ")", "7 OK"])
            .with_raw_literals(vec![vec![0x80, b'z']]);
        assert_eq!(resp.literals()[0].1, &[0x80, b'z']);
    }
}
