//! Error types for MIME decoding.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Malformed encoded text.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Charset label not known to the decoder.
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
