//! Per-entry parse failure collection.
//!
//! Batch operations walk many response entries. With a [`ParseFailures`]
//! collector the bad entries are skipped and recorded; without one the first
//! failure aborts the batch.

use std::ops::ControlFlow;

use crate::{Error, Result};

/// One response entry that could not be projected.
#[derive(Debug)]
pub struct ParseFailure {
    /// What went wrong.
    pub error: Error,
    /// The offending logical line.
    pub line: String,
}

/// Collector for parse failures of a batch.
#[derive(Debug, Default)]
pub struct ParseFailures {
    details: Vec<ParseFailure>,
}

impl ParseFailures {
    /// Creates an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            details: Vec::new(),
        }
    }

    /// The failures recorded so far.
    #[must_use]
    pub fn details(&self) -> &[ParseFailure] {
        &self.details
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.details.len()
    }

    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Removes and returns every recorded failure.
    pub fn drain(&mut self) -> Vec<ParseFailure> {
        std::mem::take(&mut self.details)
    }

    fn record(&mut self, error: Error, line: &str) {
        self.details.push(ParseFailure {
            error,
            line: line.to_string(),
        });
    }
}

/// Runs `f` on every line.
///
/// A failing line is recorded in `failures` and skipped, or returned as the
/// error when there is no collector. `f` may stop the walk early by returning
/// [`ControlFlow::Break`].
pub(crate) fn for_each_line<'a, I, F>(
    lines: I,
    mut failures: Option<&mut ParseFailures>,
    mut f: F,
) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
    F: FnMut(&'a str) -> Result<ControlFlow<()>>,
{
    let mut failed = 0usize;

    for line in lines {
        match f(line) {
            Ok(ControlFlow::Continue(())) => {}
            Ok(ControlFlow::Break(())) => break,
            Err(error) => match failures.as_deref_mut() {
                Some(collector) => {
                    collector.record(error, line);
                    failed += 1;
                }
                None => return Err(error),
            },
        }
    }

    if failed > 0 {
        tracing::warn!(failed, "skipped response entries that failed to parse");
    }
    Ok(())
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

    fn parse_number(line: &str) -> Result<u32> {
        line.parse().map_err(|_| Error::Parse(format!("not a number: {line}")))
    }

    #[test]
    fn test_collector_skips_failures() {
        let mut failures = ParseFailures::new();
        let mut numbers = Vec::new();

        for_each_line(["1", "x", "3", "y"], Some(&mut failures), |line| {
            numbers.push(parse_number(line)?);
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();

        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures.details()[0].line, "x");
        assert!(matches!(failures.details()[1].error, Error::Parse(_)));

        let drained = failures.drain();
        assert_eq!(drained.len(), 2);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_first_failure_propagates_without_collector() {
        let mut numbers = Vec::new();
        let err = for_each_line(["1", "x", "3"], None, |line| {
            numbers.push(parse_number(line)?);
            Ok(ControlFlow::Continue(()))
        })
        .unwrap_err();

        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(numbers, vec![1]);
    }

    #[test]
    fn test_break_stops_walk() {
        let mut seen = 0;
        for_each_line(["a", "b", "c"], None, |line| {
            seen += 1;
            Ok(if line == "b" {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })
        .unwrap();
        assert_eq!(seen, 2);
    }
}
