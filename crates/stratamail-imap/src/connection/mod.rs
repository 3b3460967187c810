//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction
//! - Line and literal framing over that stream
//! - Type-state client wrapper

mod client;
mod config;
mod framed;
mod stream;

pub use client::{Authenticated, Client, ImapClient, NotAuthenticated, Selected};
pub use config::{Config, ConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, Security};
pub use framed::{FramedStream, LinePart, Transport};
pub use stream::{ImapStream, connect, create_tls_connector};
