//! Reading one complete response off a [`Transport`].

use std::time::{Duration, Instant};

use super::recombine::{literal_length, recombine};
use super::{Response, Status};
use crate::connection::{LinePart, Transport};
use crate::time::Clock;
use crate::{Error, Result};

/// Reads lines until the tagged completion for `tag` arrives.
///
/// Literal payloads announced by a trailing `{n}` are read as exact byte
/// blocks and stored as their own entry. Blank lines are skipped, but the
/// time spent without receiving any data may not exceed `idle_budget`. The
/// budget restarts whenever bytes of a non-empty line or of a literal
/// arrive, so a large literal streaming slowly is not cut off.
///
/// # Errors
///
/// Returns [`Error::Timeout`] when the idle budget runs out,
/// [`Error::ConnectionClosed`] at end of stream, and any transport error.
/// After any of these the connection must be discarded.
pub async fn read_response<T, C>(
    transport: &mut T,
    tag: &str,
    clock: &C,
    idle_budget: Duration,
) -> Result<Response>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let mut idle = IdleTimer {
        clock,
        budget: idle_budget,
        last_data: clock.now(),
    };
    let mut raw_lines = Vec::new();
    let mut raw_literals = Vec::new();

    let status = loop {
        let line = read_line(transport, &mut idle).await?;
        if line.is_empty() {
            continue;
        }

        if let Some(len) = literal_length(&line) {
            raw_lines.push(line);
            let block = read_literal(transport, &mut idle, len).await?;
            raw_lines.push(String::from_utf8_lossy(&block).into_owned());
            raw_literals.push(block);
            continue;
        }

        let status = tagged_status(&line, tag);
        raw_lines.push(line);
        if let Some(status) = status {
            break status;
        }
    };

    let lines = recombine(tag, &raw_lines);
    Ok(Response::new(tag, status, lines).with_raw_literals(raw_literals))
}

/// Tracks time since data last arrived.
struct IdleTimer<'a, C: ?Sized> {
    clock: &'a C,
    budget: Duration,
    last_data: Instant,
}

impl<C: Clock + ?Sized> IdleTimer<'_, C> {
    fn touch(&mut self) {
        self.last_data = self.clock.now();
    }

    /// Runs one transport read within what is left of the budget.
    async fn bounded<F, O>(&self, read: F) -> Result<O>
    where
        F: Future<Output = Result<O>>,
    {
        let budget = self.budget;
        let remaining = self.clock.remaining(self.last_data, budget);
        if remaining.is_zero() {
            tracing::error!(?budget, "no data received within idle budget");
            return Err(Error::Timeout(budget));
        }

        tokio::time::timeout(remaining, read).await.map_err(|_| {
            tracing::error!(?budget, "no data received within idle budget");
            Error::Timeout(budget)
        })?
    }
}

/// Reads one line, restarting the budget whenever non-blank bytes arrive.
async fn read_line<T, C>(transport: &mut T, idle: &mut IdleTimer<'_, C>) -> Result<String>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let mut raw = Vec::new();
    loop {
        let seen = raw.len();
        let part = idle.bounded(transport.read_line_part(&mut raw)).await?;
        if raw[seen..].iter().any(|&b| b != b'\r' && b != b'\n') {
            idle.touch();
        }
        match part {
            LinePart::Partial => {}
            LinePart::Complete => return Ok(String::from_utf8_lossy(&raw).into_owned()),
            LinePart::Eof => return Err(Error::ConnectionClosed),
        }
    }
}

/// Reads a `len`-byte literal chunk by chunk.
async fn read_literal<T, C>(
    transport: &mut T,
    idle: &mut IdleTimer<'_, C>,
    len: usize,
) -> Result<Vec<u8>>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let mut block = Vec::new();
    while block.len() < len {
        let chunk = idle.bounded(transport.read_chunk(len - block.len())).await?;
        if chunk.is_empty() {
            return Err(Error::ConnectionClosed);
        }
        block.extend_from_slice(&chunk);
        idle.touch();
    }
    Ok(block)
}

/// Returns the status if `line` is the tagged completion for `tag`.
fn tagged_status(line: &str, tag: &str) -> Option<Status> {
    let mut words = line.split(' ');
    if words.next()? != tag {
        return None;
    }
    Status::parse(words.next()?)
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
    use crate::connection::FramedStream;
    use crate::time::{MockClock, SystemClock};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio_test::io::Builder;

    const BUDGET: Duration = Duration::from_secs(120);

    /// Clock following tokio's paused time.
    struct TokioClock;

    impl Clock for TokioClock {
        fn now(&self) -> Instant {
            tokio::time::Instant::now().into_std()
        }
    }

    /// Transport that replays lines and advances a clock on every blank one.
    struct ScriptedTransport {
        lines: VecDeque<String>,
        clock: Arc<MockClock>,
        blank_cost: Duration,
    }

    impl Transport for ScriptedTransport {
        async fn read_line(&mut self) -> Result<Option<String>> {
            let line = self.lines.pop_front();
            if line.as_deref() == Some("") {
                self.clock.advance(self.blank_cost);
            }
            Ok(line)
        }

        async fn read_exact(&mut self, _len: usize) -> Result<Vec<u8>> {
            Err(Error::Protocol("unexpected literal".into()))
        }

        async fn write_line(&mut self, _line: &str) -> Result<()> {
            Ok(())
        }
    }

    fn scripted(lines: &[&str], clock: &Arc<MockClock>, blank_cost: Duration) -> ScriptedTransport {
        ScriptedTransport {
            lines: lines.iter().map(ToString::to_string).collect(),
            clock: Arc::clone(clock),
            blank_cost,
        }
    }

    #[tokio::test]
    async fn test_read_ok_response() {
        let mock = Builder::new()
            .read(b"* CAPABILITY IMAP4rev1 IDLE\r\n")
            .read(b"0 OK CAPABILITY completed\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = read_response(&mut framed, "0", &SystemClock, BUDGET)
            .await
            .unwrap();
        assert_eq!(response.status, Status::Ok);
        assert_eq!(
            response.lines,
            vec!["* CAPABILITY IMAP4rev1 IDLE", "0 OK CAPABILITY completed"]
        );
    }

    #[tokio::test]
    async fn test_read_no_and_bad() {
        let mock = Builder::new().read(b"4 NO [NONEXISTENT] no such mailbox\r\n").build();
        let mut framed = FramedStream::new(mock);
        let response = read_response(&mut framed, "4", &SystemClock, BUDGET).await.unwrap();
        assert!(response.is_no());
        assert_eq!(response.text(), "[NONEXISTENT] no such mailbox");

        let mock = Builder::new().read(b"5 BAD syntax\r\n").build();
        let mut framed = FramedStream::new(mock);
        let response = read_response(&mut framed, "5", &SystemClock, BUDGET).await.unwrap();
        assert!(response.is_bad());
    }

    #[tokio::test]
    async fn test_other_tags_are_data() {
        let mock = Builder::new()
            .read(b"12 OK stale completion\r\n")
            .read(b"1 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = read_response(&mut framed, "1", &SystemClock, BUDGET).await.unwrap();
        assert_eq!(response.lines.len(), 2);
        assert_eq!(response.text(), "done");
    }

    #[tokio::test]
    async fn test_literal_block_is_own_entry() {
        let mock = Builder::new()
            .read(b"* 12 FETCH (BODY[1] {5}\r\n")
            .read(b"a)\"(b")
            .read(b")\r\n")
            .read(b"2 OK FETCH completed\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = read_response(&mut framed, "2", &SystemClock, BUDGET).await.unwrap();
        assert_eq!(
            response.lines,
            vec!["* 12 FETCH (BODY[1] {5}", "a)\"(b", ")", "2 OK FETCH completed"]
        );
    }

    #[tokio::test]
    async fn test_literal_with_line_breaks() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (UID 3 BODY[TEXT] {12}\r\n")
            .read(b"line1\r\nline2")
            .read(b")\r\n8 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = read_response(&mut framed, "8", &SystemClock, BUDGET).await.unwrap();
        assert_eq!(response.lines[1], "line1\r\nline2");
        assert_eq!(response.lines[2], ")");
    }

    #[tokio::test]
    async fn test_binary_literal_bytes_kept() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (UID 3 BODY[2] {4}\r\n")
            .read(&[0xff, 0x00, 0xfe, b'x'])
            .read(b")\r\n9 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = read_response(&mut framed, "9", &SystemClock, BUDGET).await.unwrap();
        let literals = response.literals();
        assert_eq!(literals.len(), 1);
        assert_eq!(literals[0].0, "* 1 FETCH (UID 3 BODY[2] {4}");
        assert_eq!(literals[0].1, &[0xff, 0x00, 0xfe, b'x']);
    }

    #[tokio::test]
    async fn test_junk_without_completion_is_transport_error() {
        let mock = Builder::new().read(b"This is junk\r\n").build();
        let mut framed = FramedStream::new(mock);

        let err = read_response(&mut framed, "0", &SystemClock, BUDGET)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_blank_lines_within_budget() {
        let clock = MockClock::shared();
        let mut transport = scripted(
            &["* 1 EXISTS", "", "", "", "3 OK done"],
            &clock,
            Duration::from_secs(30),
        );

        let response = read_response(&mut transport, "3", &*clock, BUDGET).await.unwrap();
        assert_eq!(response.lines, vec!["* 1 EXISTS", "3 OK done"]);
    }

    #[tokio::test]
    async fn test_blank_lines_past_budget_time_out() {
        let clock = MockClock::shared();
        let mut transport = scripted(
            &["* 1 EXISTS", "", "", "", "", "", "3 OK done"],
            &clock,
            Duration::from_secs(30),
        );

        let err = read_response(&mut transport, "3", &*clock, BUDGET)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == BUDGET));
    }

    #[tokio::test]
    async fn test_data_resets_budget() {
        let clock = MockClock::shared();
        let mut transport = scripted(
            &["", "", "", "* 1 EXISTS", "", "", "", "3 OK done"],
            &clock,
            Duration::from_secs(30),
        );

        let response = read_response(&mut transport, "3", &*clock, BUDGET).await.unwrap();
        assert!(response.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let mut framed = FramedStream::new(client);

        let err = read_response(&mut framed, "1", &SystemClock, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_literal_within_budget() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (UID 3 BODY[1] {30}\r\n")
            .wait(Duration::from_secs(50))
            .read(b"0123456789")
            .wait(Duration::from_secs(50))
            .read(b"abcdefghij")
            .wait(Duration::from_secs(50))
            .read(b"ABCDEFGHIJ")
            .read(b")\r\n4 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = read_response(&mut framed, "4", &TokioClock, BUDGET).await.unwrap();
        assert_eq!(response.lines[1], "0123456789abcdefghijABCDEFGHIJ");
        assert!(response.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_line_within_budget() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (UID 3 ")
            .wait(Duration::from_secs(90))
            .read(b"FLAGS (\\Seen))\r\n")
            .wait(Duration::from_secs(90))
            .read(b"4 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = read_response(&mut framed, "4", &TokioClock, BUDGET).await.unwrap();
        assert_eq!(response.lines[0], "* 1 FETCH (UID 3 FLAGS (\\Seen))");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_literal_times_out() {
        use tokio::io::AsyncWriteExt;

        let (client, mut server) = tokio::io::duplex(256);
        server
            .write_all(b"* 1 FETCH (UID 3 BODY[1] {30}\r\n0123456789")
            .await
            .unwrap();
        let mut framed = FramedStream::new(client);

        let err = read_response(&mut framed, "4", &TokioClock, BUDGET)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == BUDGET));
    }

    #[test]
    fn test_tagged_status() {
        assert_eq!(tagged_status("A1 OK done", "A1"), Some(Status::Ok));
        assert_eq!(tagged_status("A1 no", "A1"), Some(Status::No));
        assert_eq!(tagged_status("A12 OK done", "A1"), None);
        assert_eq!(tagged_status("A1 OKAY", "A1"), None);
        assert_eq!(tagged_status("* OK", "A1"), None);
    }
}
