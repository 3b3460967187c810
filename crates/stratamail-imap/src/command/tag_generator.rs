//! Command tags.
//!
//! Tags are plain decimal numbers counted per connection from 0.

/// Sequential tag source owned by one connection.
#[derive(Debug, Default, Clone)]
pub struct TagGenerator {
    counter: u64,
}

impl TagGenerator {
    /// Creates a generator whose first tag is `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Returns the next tag.
    pub fn next_tag(&mut self) -> String {
        let n = self.counter;
        self.counter = self.counter.wrapping_add(1);
        n.to_string()
    }

    /// The number the next tag will carry.
    #[must_use]
    pub const fn peek(&self) -> u64 {
        self.counter
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
    fn test_tags_count_from_zero() {
        let mut tags = TagGenerator::new();
        assert_eq!(tags.next_tag(), "0");
        assert_eq!(tags.next_tag(), "1");
        assert_eq!(tags.next_tag(), "2");
        assert_eq!(tags.peek(), 3);
    }

    #[test]
    fn test_uniqueness() {
        let mut tags = TagGenerator::default();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10000 {
            assert!(seen.insert(tags.next_tag()), "duplicate tag generated");
        }
    }

    #[test]
    fn test_wraps_instead_of_panicking() {
        let mut tags = TagGenerator { counter: u64::MAX };
        assert_eq!(tags.next_tag(), u64::MAX.to_string());
        assert_eq!(tags.next_tag(), "0");
    }
}
