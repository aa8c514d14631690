//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
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

    /// The server rejected the credentials.
    #[error("Authentication rejected ({code}): {message}")]
    AuthRejected {
        /// Reply code (e.g., 535).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if the server refused the supplied credentials.
    #[must_use]
    pub const fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::AuthRejected { .. })
    }

    /// Returns true if the peer closed the connection mid-exchange.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
            || matches!(self, Self::SmtpError { code: 421, .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejected_is_classified() {
        let err = Error::AuthRejected {
            code: 535,
            message: "5.7.8 bad credentials".into(),
        };
        assert!(err.is_auth_rejected());
        assert!(!err.is_disconnect());
    }

    #[test]
    fn eof_and_421_are_disconnects() {
        let eof = Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
        assert!(eof.is_disconnect());
        assert!(Error::smtp_error(421, "closing").is_disconnect());
        assert!(!Error::smtp_error(550, "nope").is_disconnect());
    }
}
