//! # stratamail-imap
//!
//! The protocol core of an IMAP client: it turns a raw byte stream into
//! complete tagged responses and projects them into folders, messages,
//! addresses and body parts.
//!
//! ## Features
//!
//! - **Response framing**: literal blocks read by length, hard-wrapped lines
//!   recombined, blank lines bounded by an idle budget
//! - **List parsing**: nested, quoted and escaped IMAP lists into a token
//!   tree, with encoded-words decoded on the way
//! - **Record builders**: `SELECT` state, `ENVELOPE`, `BODYSTRUCTURE` and
//!   caller-named extension items such as `X-GM-MSGID`
//! - **Type-state connection management**: `NotAuthenticated` →
//!   `Authenticated` → `Selected` enforced at compile time
//! - **TLS via rustls**: Secure connections without OpenSSL dependency
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratamail_imap::{Config, FetchOptions, ImapClient, SequenceRange};
//!
//! # async fn run() -> stratamail_imap::Result<()> {
//! let config = Config::new("imap.example.com");
//! let client = ImapClient::connect(&config).await?;
//! let client = client.login("user@example.com", "password").await?;
//!
//! let (mut client, folder) = client.examine("INBOX").await?;
//! println!("{} messages", folder.exists);
//!
//! let messages = client
//!     .fetch_messages(SequenceRange::all(), FetchOptions::all(), &[], None)
//!     .await?;
//! for message in &messages {
//!     println!("{} {}", message.uid, message.subject);
//! }
//!
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login()/authenticate() ───→ Authenticated
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── select()/examine() ───→ Selected
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │      Selected       │ ─── unselect() ───→ Authenticated
//! └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and tags
//! - [`connection`]: Transport, configuration and the type-state client
//! - [`response`]: Response framing and line recombination
//! - [`parser`]: IMAP list parser and token tree
//! - [`types`]: Folder, message, address and body part records
//! - [`fetch`]: Fetch batching and section payloads

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod failure;
pub mod fetch;
pub mod parser;
pub mod response;
pub mod time;
pub mod types;

pub use command::{Command, FetchItem, FetchOptions, StoreAction, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FramedStream, ImapClient, ImapStream,
    LinePart, NotAuthenticated, Security, Selected, Transport,
};
pub use error::{Error, Result};
pub use failure::{ParseFailure, ParseFailures};
pub use fetch::{DEFAULT_BATCH_SIZE, SectionPayload, uid_batches};
pub use parser::{Token, TokenList};
pub use response::{Response, Status};
pub use types::{
    Address, BodyPart, ExtensionValue, Folder, ListedFolder, Message, SequenceRange,
};
