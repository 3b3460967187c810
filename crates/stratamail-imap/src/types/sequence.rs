//! Message ranges for FETCH and STORE.

use std::fmt;

/// An inclusive range of sequence numbers or UIDs.
///
/// An open end (`end == None`) stands for the last message in the mailbox
/// and renders as `*`. A range of one number renders as that number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRange {
    /// First number of the range.
    pub start: u64,
    /// Last number of the range, or `None` for `*`.
    pub end: Option<u64>,
}

impl SequenceRange {
    /// Creates a closed range.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Creates a range covering a single number.
    #[must_use]
    pub const fn single(n: u64) -> Self {
        Self::new(n, n)
    }

    /// Creates a range from `start` to the last message.
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self { start, end: None }
    }

    /// Creates a range covering every message.
    #[must_use]
    pub const fn all() -> Self {
        Self::starting_at(1)
    }
}

impl fmt::Display for SequenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) if end == self.start => write!(f, "{end}"),
            Some(end) => write!(f, "{}:{end}", self.start),
            None => write!(f, "{}:*", self.start),
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

    #[test]
    fn test_display() {
        assert_eq!(SequenceRange::new(1, 100).to_string(), "1:100");
        assert_eq!(SequenceRange::single(42).to_string(), "42");
        assert_eq!(SequenceRange::starting_at(7).to_string(), "7:*");
        assert_eq!(SequenceRange::all().to_string(), "1:*");
    }
}
