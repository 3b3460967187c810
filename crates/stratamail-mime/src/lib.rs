//! # stratamail-mime
//!
//! Decoders for the MIME text that appears inside IMAP responses.
//!
//! ## Features
//!
//! - **Encoded-words**: RFC 2047 `=?charset?Q|B?...?=` header text
//! - **Transfer encodings**: Base64, Quoted-Printable, 7bit/8bit/binary
//! - **Charsets**: label lookup with a 7-bit fallback
//! - **Content types**: parsing and validation of `type/subtype; params`
//!
//! Decoding never panics on hostile input. Functions that can reject input
//! return [`Result`]; the header-oriented helpers fall back to the raw text.
//!
//! ## Example
//!
//! ```
//! use stratamail_mime::decode_encoded_words;
//!
//! let subject = decode_encoded_words("=?ISO-8859-1?Q?Caf=E9?= menu");
//! assert_eq!(subject, "Café menu");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod charset;
mod content_type;
mod encoded_word;
mod error;

pub mod encoding;

pub use charset::Charset;
pub use content_type::ContentType;
pub use encoded_word::decode_encoded_words;
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
