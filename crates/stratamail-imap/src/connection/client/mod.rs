//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after connection
//! - `Authenticated`: After successful LOGIN/AUTHENTICATE
//! - `Selected`: After successful SELECT/EXAMINE
//!
//! Each state only exposes methods that are valid for that state. Commands
//! run strictly one at a time; a transport error leaves the client unusable.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::sync::Arc;
use std::time::Duration;

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, Transport};
use super::stream::ImapStream;
use crate::command::{Command, TagGenerator};
use crate::response::{Response, Status, read_response};
use crate::time::{SharedClock, SystemClock};
use crate::types::Folder;
use crate::{Error, Result};

/// Client over a TCP or TLS socket, as returned by [`Client::connect`].
pub type ImapClient<State> = Client<FramedStream<ImapStream>, State>;

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<T, State> {
    pub(crate) transport: T,
    pub(crate) tags: TagGenerator,
    pub(crate) clock: SharedClock,
    pub(crate) read_timeout: Duration,
    pub(crate) broken: bool,
    pub(crate) state: State,
}

impl<T, State: std::fmt::Debug> std::fmt::Debug for Client<T, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tags", &self.tags)
            .field("read_timeout", &self.read_timeout)
            .field("broken", &self.broken)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<T, State> Client<T, State>
where
    T: Transport,
{
    /// Sends a command and reads its complete response.
    ///
    /// NO and BAD completions are returned as responses, not errors.
    pub async fn send_receive(&mut self, command: &Command) -> Result<Response> {
        if self.broken {
            return Err(Error::InvalidState(
                "connection failed earlier and must be reopened".to_string(),
            ));
        }

        let tag = self.tags.next_tag();
        tracing::debug!(tag = %tag, command = command.verb(), "sending command");

        let result = self.exchange(&tag, command).await;
        match &result {
            Ok(response) => {
                tracing::debug!(tag = %tag, status = %response.status, lines = response.lines.len(), "command completed");
            }
            Err(e) if e.is_transport() => {
                tracing::error!(tag = %tag, error = %e, "connection failed");
                self.broken = true;
            }
            Err(_) => {}
        }
        result
    }

    async fn exchange(&mut self, tag: &str, command: &Command) -> Result<Response> {
        self.transport.write_line(&command.serialize(tag)).await?;
        read_response(&mut self.transport, tag, &*self.clock, self.read_timeout).await
    }

    /// Sends a command and converts NO and BAD into errors.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Response> {
        let response = self.send_receive(command).await?;
        check_status(response)
    }

    /// The number the next command's tag will carry.
    #[must_use]
    pub const fn next_command_number(&self) -> u64 {
        self.tags.peek()
    }

    /// Returns true once a transport error has made the client unusable.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.broken
    }

    /// The idle budget applied to every response.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Replaces the clock that measures the idle budget.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Gracefully disconnects from the server.
    ///
    /// A server that closes the connection right after its BYE is not an
    /// error.
    pub async fn logout(mut self) -> Result<()> {
        match self.send_receive(&Command::Logout).await {
            Ok(_) | Err(Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn into_state<Next>(self, state: Next) -> Client<T, Next> {
        Client {
            transport: self.transport,
            tags: self.tags,
            clock: self.clock,
            read_timeout: self.read_timeout,
            broken: self.broken,
            state,
        }
    }

    /// Runs SELECT or EXAMINE and moves to the selected state.
    pub(crate) async fn open_folder(
        mut self,
        name: &str,
        read_only: bool,
    ) -> Result<(Client<T, Selected>, Folder)> {
        let command = if read_only {
            Command::Examine {
                mailbox: name.to_string(),
            }
        } else {
            Command::Select {
                mailbox: name.to_string(),
            }
        };

        let response = self.execute(&command).await?;
        let mut folder = Folder::from_lines(name, &response.lines);
        folder.read_only |= read_only;
        tracing::debug!(
            folder = %folder.name,
            exists = folder.exists,
            read_only = folder.read_only,
            "folder opened"
        );

        let client = self.into_state(Selected::new(folder.clone()));
        Ok((client, folder))
    }
}

/// Converts NO and BAD completions into errors.
pub(crate) fn check_status(response: Response) -> Result<Response> {
    match response.status {
        Status::Ok => Ok(response),
        Status::No => Err(Error::No(response.text().to_string())),
        Status::Bad => Err(Error::Bad(response.text().to_string())),
    }
}

/// Treats NO as an empty result and BAD as an error.
///
/// Returns `None` for NO.
pub(crate) fn accept_no(response: Response) -> Result<Option<Response>> {
    match response.status {
        Status::Ok => Ok(Some(response)),
        Status::No => {
            tracing::debug!(text = response.text(), "command answered NO");
            Ok(None)
        }
        Status::Bad => Err(Error::Bad(response.text().to_string())),
    }
}

impl<T> Client<T, NotAuthenticated>
where
    T: Transport,
{
    /// Wraps a connected transport and reads the server greeting.
    ///
    /// The greeting must start with `* OK`.
    pub async fn from_transport(transport: T, read_timeout: Duration) -> Result<Self> {
        let mut client = Self {
            transport,
            tags: TagGenerator::new(),
            clock: Arc::new(SystemClock),
            read_timeout,
            broken: false,
            state: NotAuthenticated,
        };

        let greeting = tokio::time::timeout(read_timeout, client.read_greeting())
            .await
            .map_err(|_| Error::Timeout(read_timeout))??;

        if !greeting.starts_with("* OK") {
            return Err(Error::Protocol(format!("unexpected greeting: {greeting}")));
        }
        tracing::debug!(greeting = %greeting, "server greeting");
        Ok(client)
    }

    async fn read_greeting(&mut self) -> Result<String> {
        loop {
            let line = self
                .transport
                .read_line()
                .await?
                .ok_or(Error::ConnectionClosed)?;
            if !line.is_empty() {
                return Ok(line);
            }
        }
    }
}

impl ImapClient<NotAuthenticated> {
    /// Connects to the configured server and reads the greeting.
    pub async fn connect(config: &super::Config) -> Result<Self> {
        let stream = super::stream::connect(config).await?;
        Self::from_transport(FramedStream::new(stream), config.read_timeout).await
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
    use tokio_test::io::Builder;

    use super::*;
    use crate::connection::DEFAULT_READ_TIMEOUT;

    #[tokio::test]
    async fn test_greeting_accepted() {
        let mock = Builder::new().read(b"* OK IMAP4rev1 ready\r\n").build();
        let client = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(client.next_command_number(), 0);
        assert!(!client.is_broken());
    }

    #[tokio::test]
    async fn test_bad_greeting_rejected() {
        let mock = Builder::new().read(b"* BYE go away\r\n").build();
        let err = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_send_receive_returns_raw_status() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"0 NOOP\r\n")
            .read(b"0 NO not today\r\n")
            .build();
        let mut client = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();

        let response = client
            .send_receive(&Command::Raw("NOOP".to_string()))
            .await
            .unwrap();
        assert!(response.is_no());
        assert_eq!(response.text(), "not today");
        assert_eq!(client.next_command_number(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_breaks_client() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"0 NOOP\r\n")
            .build();
        let mut client = Client::from_transport(FramedStream::new(mock), DEFAULT_READ_TIMEOUT)
            .await
            .unwrap();

        let err = client
            .send_receive(&Command::Raw("NOOP".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(client.is_broken());

        let err = client
            .send_receive(&Command::Raw("NOOP".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_check_status() {
        let ok = Response::new("1", Status::Ok, vec!["1 OK done".to_string()]);
        assert!(check_status(ok).is_ok());

        let no = Response::new("1", Status::No, vec!["1 NO denied".to_string()]);
        assert!(matches!(check_status(no.clone()), Err(Error::No(t)) if t == "denied"));
        assert!(accept_no(no).unwrap().is_none());

        let bad = Response::new("1", Status::Bad, vec!["1 BAD what".to_string()]);
        assert!(matches!(accept_no(bad), Err(Error::Bad(t)) if t == "what"));
    }
}
