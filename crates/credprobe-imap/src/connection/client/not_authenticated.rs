//! Implementation for the not-authenticated state.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::config::Config;
use crate::connection::framed::FramedStream;
use crate::connection::stream::{ImapStream, connect};
use crate::response::{Response, Status};
use crate::{Error, Result};

impl Client<ImapStream, NotAuthenticated> {
    /// Connects as configured and reads the greeting, applying the
    /// configured I/O timeout to every later read and write.
    pub async fn connect(config: &Config) -> Result<Self> {
        let stream = connect(config).await?;
        Self::from_framed(FramedStream::with_timeout(stream, config.io_timeout)).await
    }
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and any capabilities it carries.
    pub async fn from_stream(stream: S) -> Result<Self> {
        Self::from_framed(FramedStream::new(stream)).await
    }

    async fn from_framed(mut framed: FramedStream<S>) -> Result<Self> {
        let greeting = Response::parse(&framed.read_response().await?)?;
        let capabilities = greeting.capabilities().unwrap_or_default();

        match greeting {
            Response::Status {
                status: Status::Ok | Status::PreAuth,
                ..
            } => {}
            Response::Status {
                status: Status::Bye,
                text,
                ..
            } => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            _state: PhantomData,
        })
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// A tagged NO is reported as [`Error::Auth`]; every other failure keeps
    /// its own variant so callers can tell bad credentials from a broken
    /// session.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if self.login_disabled() {
            return Err(Error::InvalidState(
                "server advertises LOGINDISABLED".to_string(),
            ));
        }

        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        match self.execute(&command).await {
            Ok(_) => Ok(self.transition()),
            Err(Error::No(text)) => Err(Error::Auth(text)),
            Err(e) => Err(e),
        }
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
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_greeting_capabilities_recorded() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 LOGIN-REFERRALS] ready\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        assert!(client.has_capability("imap4rev1"));
        assert!(!client.login_disabled());
    }

    #[tokio::test]
    async fn test_bye_greeting() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Bye(text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_garbage_greeting() {
        let mock = Builder::new().read(b"220 smtp.example.com ESMTP\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user pass\r\n")
            .read(b"* CAPABILITY IMAP4rev1 IDLE\r\n")
            .read(b"A0000 OK LOGIN completed\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("user", "pass").await.unwrap();
        assert!(client.has_capability("IDLE"));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user wrong\r\n")
            .read(b"A0000 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let err = client.login("user", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::Auth(text) if text == "Invalid credentials"));
    }

    #[tokio::test]
    async fn test_login_bad_is_not_auth() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user pass\r\n")
            .read(b"A0000 BAD command unknown\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let err = client.login("user", "pass").await.unwrap_err();
        assert!(matches!(err, Error::Bad(_)));
    }

    #[tokio::test]
    async fn test_login_disabled() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 LOGINDISABLED] ready\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let err = client.login("user", "pass").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_logout_tolerates_hangup() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGOUT\r\n")
            .read(b"* BYE logging out\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        client.logout().await.unwrap();
    }
}
