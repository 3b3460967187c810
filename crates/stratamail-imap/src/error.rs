//! Error types for the IMAP library.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Nothing was received for longer than the idle budget.
    #[error("No data received for {0:?}")]
    Timeout(Duration),

    /// The server closed the connection mid-response.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// A response entry could not be projected into a record.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Server rejected the command (NO).
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server reported the command as malformed (BAD).
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Whether the error came from the transport.
    ///
    /// Framing violations count too: after one the stream position is
    /// unknown. A connection that produced a transport error must be
    /// discarded.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Tls(_)
                | Self::InvalidDnsName(_)
                | Self::Timeout(_)
                | Self::ConnectionClosed
                | Self::Protocol(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

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
    fn test_transport_classification() {
        assert!(Error::Timeout(Duration::from_secs(1)).is_transport());
        assert!(Error::ConnectionClosed.is_transport());
        assert!(Error::Io(std::io::Error::other("reset")).is_transport());
        assert!(!Error::No("no such mailbox".into()).is_transport());
        assert!(!Error::Bad("syntax".into()).is_transport());
        assert!(Error::Protocol("line too long".into()).is_transport());
        assert!(!Error::Parse("bad uid".into()).is_transport());
        assert!(!Error::InvalidState("broken".into()).is_transport());
    }
}
