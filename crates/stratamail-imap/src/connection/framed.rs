//! Line and block I/O for the IMAP protocol.
//!
//! The [`Transport`] trait is the only thing the response framer needs from
//! the network: CRLF-terminated text lines, exact-length byte blocks for
//! literals, and flushed command writes. [`FramedStream`] implements it over
//! any tokio socket.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// A duplex byte channel that can be read by line or by block.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Reads one line without its terminator.
    ///
    /// Returns `Ok(None)` at end of stream.
    async fn read_line(&mut self) -> Result<Option<String>>;

    /// Reads exactly `len` raw bytes.
    async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Appends whatever part of the current line is available to `line`.
    ///
    /// Lets a caller observe progress on a line that arrives slowly. The
    /// default reads the whole line at once.
    async fn read_line_part(&mut self, line: &mut Vec<u8>) -> Result<LinePart> {
        match self.read_line().await? {
            Some(text) => {
                line.extend_from_slice(text.as_bytes());
                Ok(LinePart::Complete)
            }
            None => Ok(LinePart::Eof),
        }
    }

    /// Reads between one and `remaining` bytes of a literal block.
    ///
    /// An empty result means end of stream. The default reads the whole
    /// block at once.
    async fn read_chunk(&mut self, remaining: usize) -> Result<Vec<u8>> {
        self.read_exact(remaining).await
    }

    /// Writes `line` followed by CRLF and flushes.
    async fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Progress reported by [`Transport::read_line_part`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePart {
    /// More of the line is still to come.
    Partial,
    /// The line is complete; its terminator has been stripped.
    Complete,
    /// The stream ended before any byte of a new line arrived.
    Eof,
}

/// Buffered [`Transport`] over an async socket.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads raw bytes up to and including the next LF.
    async fn read_raw_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(line);
            }

            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&buf[..=pos]);
                self.reader.consume(pos + 1);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }

        Ok(line)
    }

    /// Gets a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Note: Any buffered data will be lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

impl<S> Transport for FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn read_line(&mut self) -> Result<Option<String>> {
        let raw = self.read_raw_line().await?;
        if raw.is_empty() {
            return Ok(None);
        }

        let text = String::from_utf8_lossy(trim_line_ending(&raw)).into_owned();
        tracing::trace!(line = %text, "S:");
        Ok(Some(text))
    }

    async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        check_literal_size(len)?;

        let mut block = vec![0u8; len];
        match self.reader.read_exact(&mut block).await {
            Ok(_) => Ok(block),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::ConnectionClosed),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_line_part(&mut self, line: &mut Vec<u8>) -> Result<LinePart> {
        let buf = self.reader.fill_buf().await?;
        if buf.is_empty() {
            return if line.is_empty() {
                Ok(LinePart::Eof)
            } else {
                Err(Error::ConnectionClosed)
            };
        }

        let (take, complete) = match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (buf.len(), false),
        };
        line.extend_from_slice(&buf[..take]);
        self.reader.consume(take);

        if line.len() > MAX_LINE_LENGTH {
            return Err(Error::Protocol("line too long".to_string()));
        }
        if !complete {
            return Ok(LinePart::Partial);
        }

        let len = trim_line_ending(line).len();
        line.truncate(len);
        tracing::trace!(line = %String::from_utf8_lossy(line), "S:");
        Ok(LinePart::Complete)
    }

    async fn read_chunk(&mut self, remaining: usize) -> Result<Vec<u8>> {
        check_literal_size(remaining)?;

        let buf = self.reader.fill_buf().await?;
        let take = buf.len().min(remaining);
        let chunk = buf[..take].to_vec();
        self.reader.consume(take);
        Ok(chunk)
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(line.as_bytes());
        self.write_buffer.extend_from_slice(b"\r\n");

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }
}

fn check_literal_size(len: usize) -> Result<()> {
    if len > MAX_LITERAL_SIZE {
        return Err(Error::Protocol(format!(
            "literal too large: {len} bytes (max {MAX_LITERAL_SIZE})"
        )));
    }
    Ok(())
}

/// Strips a trailing CRLF or LF.
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
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
    use tokio_test::io::Builder;

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending(b"hello\r\n"), b"hello");
        assert_eq!(trim_line_ending(b"hello\n"), b"hello");
        assert_eq!(trim_line_ending(b"hello"), b"hello");
        assert_eq!(trim_line_ending(b"\r\n"), b"");
    }

    #[tokio::test]
    async fn test_read_lines() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .read(b"\r\n")
            .read(b"A1 OK ")
            .read(b"done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_line().await.unwrap().as_deref(), Some("* OK ready"));
        assert_eq!(framed.read_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(framed.read_line().await.unwrap().as_deref(), Some("A1 OK done"));
        assert_eq!(framed.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_invalid_utf8_is_lossy() {
        let mock = Builder::new().read(b"* caf\xE9\r\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(
            framed.read_line().await.unwrap().as_deref(),
            Some("* caf\u{FFFD}")
        );
    }

    #[tokio::test]
    async fn test_read_exact_after_line() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {5}\r\nhel")
            .read(b"lo)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(
            framed.read_line().await.unwrap().as_deref(),
            Some("* 1 FETCH (BODY[] {5}")
        );
        assert_eq!(framed.read_exact(5).await.unwrap(), b"hello");
        assert_eq!(framed.read_line().await.unwrap().as_deref(), Some(")"));
    }

    #[tokio::test]
    async fn test_read_exact_eof() {
        let mock = Builder::new().read(b"abc").build();
        let mut framed = FramedStream::new(mock);

        assert!(matches!(
            framed.read_exact(10).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let mock = Builder::new().build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_exact(MAX_LITERAL_SIZE + 1).await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_line().await.unwrap_err();
        assert!(err.to_string().contains("line too long"));
    }

    #[tokio::test]
    async fn test_read_line_in_parts() {
        let mock = Builder::new()
            .read(b"* 1 FETCH ")
            .read(b"(UID 7)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let mut line = Vec::new();
        assert_eq!(framed.read_line_part(&mut line).await.unwrap(), LinePart::Partial);
        assert_eq!(framed.read_line_part(&mut line).await.unwrap(), LinePart::Complete);
        assert_eq!(line, b"* 1 FETCH (UID 7)");

        let mut next = Vec::new();
        assert_eq!(framed.read_line_part(&mut next).await.unwrap(), LinePart::Eof);
    }

    #[tokio::test]
    async fn test_line_part_eof_mid_line() {
        let mock = Builder::new().read(b"* 1 FE").build();
        let mut framed = FramedStream::new(mock);

        let mut line = Vec::new();
        assert_eq!(framed.read_line_part(&mut line).await.unwrap(), LinePart::Partial);
        assert!(matches!(
            framed.read_line_part(&mut line).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_chunk_stops_at_remaining() {
        let mock = Builder::new().read(b"abcdef)\r\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_chunk(4).await.unwrap(), b"abcd");
        assert_eq!(framed.read_chunk(2).await.unwrap(), b"ef");
        assert_eq!(framed.read_line().await.unwrap().as_deref(), Some(")"));
        assert!(framed.read_chunk(1).await.unwrap().is_empty());
        assert!(framed.read_chunk(MAX_LITERAL_SIZE + 1).await.is_err());
    }

    #[tokio::test]
    async fn test_write_line() {
        let mock = Builder::new().write(b"0 LOGIN user pass\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_line("0 LOGIN user pass").await.unwrap();
    }
}
