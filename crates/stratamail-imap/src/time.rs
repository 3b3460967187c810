//! Time abstraction for the idle-read budget.
//!
//! The framer measures how long it has gone without receiving data through
//! a [`Clock`], so tests can drive the budget without sleeping.
//!
//! # Example
//!
//! ```
//! use stratamail_imap::time::{Clock, MockClock};
//! use std::time::Duration;
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(90));
//! assert!(!clock.has_elapsed(start, Duration::from_secs(120)));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Abstraction over time for testability.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Returns the elapsed time since the given instant.
    fn elapsed(&self, since: Instant) -> Duration {
        self.now().saturating_duration_since(since)
    }

    /// Checks if a duration has elapsed since the given instant.
    fn has_elapsed(&self, since: Instant, duration: Duration) -> bool {
        self.elapsed(since) >= duration
    }

    /// Returns how much of `budget` is left since `since`.
    fn remaining(&self, since: Instant, budget: Duration) -> Duration {
        budget.saturating_sub(self.elapsed(since))
    }
}

/// System clock that uses real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A manually advanced clock for tests.
#[derive(Debug)]
pub struct MockClock {
    base: Instant,
    offset_nanos: AtomicU64,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Creates a new mock clock starting at the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    /// Creates a mock clock that can be shared with a client.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances the clock by the given duration.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&self, duration: Duration) {
        let nanos = duration.as_nanos() as u64;
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Returns the current offset from the base time.
    #[must_use]
    pub fn offset(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.base + self.offset()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        self.as_ref().now()
    }
}

/// A shared clock for dynamic dispatch.
pub type SharedClock = Arc<dyn Clock>;

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
    fn test_mock_clock_advance() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.elapsed(start), Duration::from_secs(10));
        assert_eq!(clock.offset(), Duration::from_secs(10));
    }

    #[test]
    fn test_remaining_budget() {
        let clock = MockClock::new();
        let start = clock.now();
        let budget = Duration::from_secs(120);

        assert_eq!(clock.remaining(start, budget), budget);
        clock.advance(Duration::from_secs(100));
        assert_eq!(clock.remaining(start, budget), Duration::from_secs(20));
        clock.advance(Duration::from_secs(100));
        assert_eq!(clock.remaining(start, budget), Duration::ZERO);
        assert!(clock.has_elapsed(start, budget));
    }

    #[test]
    fn test_shared_clock_dispatch() {
        let mock = MockClock::shared();
        let shared: SharedClock = mock.clone();
        let start = shared.now();

        mock.advance(Duration::from_secs(3));
        assert_eq!(shared.elapsed(start), Duration::from_secs(3));
    }
}
