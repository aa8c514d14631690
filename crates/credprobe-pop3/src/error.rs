//! Error types for POP3 operations.

use std::io;
use std::time::Duration;

/// Result type alias for POP3 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// POP3 error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Hostname is not usable as a TLS server name.
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// Connecting to the server did not finish in time.
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered USER or PASS with `-ERR`.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// The server answered any other command with `-ERR`.
    #[error("Server returned -ERR: {0}")]
    ErrResponse(String),

    /// Argument cannot be sent on a single command line.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Protocol error (unexpected response).
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns true if the server refused the supplied credentials.
    #[must_use]
    pub const fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::AuthRejected(_))
    }

    /// Returns true if the peer closed the connection mid-exchange.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}
