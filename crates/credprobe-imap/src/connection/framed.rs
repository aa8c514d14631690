//! Framed I/O for IMAP protocol.
//!
//! IMAP uses CRLF-terminated lines, and any line may announce a `{n}` literal
//! whose bytes belong to the same response. Greetings and untagged data from
//! some servers carry literals, so the reader collects them before parsing.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Maximum literal size. Nothing a probe reads legitimately comes close.
const MAX_LITERAL_SIZE: usize = 1024 * 1024;

/// Framed connection for IMAP protocol.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    line: BytesMut,
    io_timeout: Option<Duration>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream without a per-read deadline.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            line: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            io_timeout: None,
        }
    }

    /// Creates a framed stream where every response read and command write
    /// must finish within `timeout`.
    pub fn with_timeout(stream: S, timeout: Duration) -> Self {
        let mut framed = Self::new(stream);
        framed.io_timeout = Some(timeout);
        framed
    }

    /// Reads one complete response including any embedded literals.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_response_inner())
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => self.read_response_inner().await,
        }
    }

    /// Reads responses until the tagged completion for `tag` arrives.
    ///
    /// The tagged line is the last element of the returned vector.
    pub async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut responses = Vec::new();
        loop {
            let response = self.read_response().await?;
            let done = is_tagged_with(&response, tag);
            responses.push(response);
            if done {
                return Ok(responses);
            }
        }
    }

    /// Writes a serialized command and flushes it.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        let write = async {
            stream.write_all(data).await?;
            stream.flush().await
        };
        match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .map_err(|_| Error::Timeout(limit))??,
            None => write.await?,
        }
        Ok(())
    }

    /// Shuts down the write half of the underlying stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }

    /// Consumes the framed stream and returns the inner stream.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }

    async fn read_response_inner(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            self.read_line().await?;
            response.extend_from_slice(&self.line);

            let Some(literal_len) = parse_literal_length(&self.line) else {
                break;
            };
            if literal_len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }
            let start = response.len();
            response.resize(start + literal_len, 0);
            self.reader.read_exact(&mut response[start..]).await?;
        }

        Ok(response)
    }

    async fn read_line(&mut self) -> Result<()> {
        self.line.clear();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(pos) = find_crlf(buf) {
                self.line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                return Ok(());
            }

            let len = buf.len();
            self.line.extend_from_slice(buf);
            self.reader.consume(len);

            if self.line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }
}

fn is_tagged_with(response: &[u8], tag: &str) -> bool {
    response
        .strip_prefix(tag.as_bytes())
        .is_some_and(|rest| rest.first() == Some(&b' '))
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses `{123}` or `{123+}` at the end of a CRLF-terminated line.
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);
    let open = line.iter().rposition(|&b| b == b'{')?;
    std::str::from_utf8(&line[open + 1..]).ok()?.parse().ok()
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
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"* OK {12}\r\n"), Some(12));
        assert_eq!(parse_literal_length(b"{7+}\r\n"), Some(7));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"* OK ready\r\n"), None);
        assert_eq!(parse_literal_length(b"{12}"), None);
        assert_eq!(parse_literal_length(b"{x1}\r\n"), None);
    }

    #[test]
    fn test_is_tagged_with() {
        assert!(is_tagged_with(b"A0001 OK done\r\n", "A0001"));
        assert!(!is_tagged_with(b"A00010 OK done\r\n", "A0001"));
        assert!(!is_tagged_with(b"* OK done\r\n", "A0001"));
    }

    #[tokio::test]
    async fn test_read_greeting_with_literal() {
        let mock = Builder::new()
            .read(b"* OK [ALERT] {5}\r\n")
            .read(b"hello ready\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK [ALERT] {5}\r\nhello ready\r\n");
    }

    #[tokio::test]
    async fn test_read_until_tagged_collects_untagged() {
        let mock = Builder::new()
            .read(b"* 3 EXISTS\r\n* 0 RECENT\r\n")
            .read(b"A0002 OK [READ-WRITE] SELECT completed\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let responses = framed.read_until_tagged("A0002").await.unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0], b"* 3 EXISTS\r\n");
        assert_eq!(responses[2], b"A0002 OK [READ-WRITE] SELECT completed\r\n");
    }

    #[tokio::test]
    async fn test_eof_is_unexpected_eof() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.is_disconnect());
    }

    #[tokio::test]
    async fn test_oversized_literal_rejected() {
        let header = format!("* OK {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("line too long"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let mock = Builder::new().wait(Duration::from_secs(30)).build();
        let mut framed = FramedStream::with_timeout(mock, Duration::from_secs(5));

        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(5)));
    }
}
