//! Type-state POP3 client.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::reply::{Reply, StatResult};
use std::io;
use std::marker::PhantomData;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// RFC 1939 caps responses at 512 octets; leave room for chatty servers.
const MAX_LINE_LENGTH: usize = 2048;

/// Type-state marker for the AUTHORIZATION state.
#[derive(Debug)]
pub struct Authorization;

/// Type-state marker for the TRANSACTION state.
#[derive(Debug)]
pub struct Transaction;

/// POP3 client with type-state pattern.
#[derive(Debug)]
pub struct Client<S, State> {
    stream: BufReader<S>,
    greeting: String,
    _state: PhantomData<State>,
}

impl<S, State> Client<S, State> {
    /// Returns the text of the server greeting.
    #[must_use]
    pub fn greeting(&self) -> &str {
        &self.greeting
    }
}

impl<S> Client<S, Authorization>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the `+OK` greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrResponse`] if the server greets with `-ERR`.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut stream = BufReader::new(stream);
        let greeting = match read_reply(&mut stream).await? {
            Reply::Ok(text) => text,
            Reply::Err(text) => return Err(Error::ErrResponse(text)),
        };
        tracing::debug!(%greeting, "POP3 greeting received");

        Ok(Self {
            stream,
            greeting,
            _state: PhantomData,
        })
    }

    /// Authenticates with USER and PASS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthRejected`] if either command is answered `-ERR`.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Transaction>> {
        for command in [
            Command::User(username.to_string()),
            Command::Pass(password.to_string()),
        ] {
            if let Reply::Err(text) = self.send_command(&command).await? {
                return Err(Error::AuthRejected(text));
            }
        }

        Ok(Client {
            stream: self.stream,
            greeting: self.greeting,
            _state: PhantomData,
        })
    }
}

impl<S> Client<S, Transaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the message count and maildrop size.
    ///
    /// # Errors
    ///
    /// Returns an error if the server answers `-ERR` or a malformed line.
    pub async fn stat(&mut self) -> Result<StatResult> {
        let text = self.expect_ok(&Command::Stat).await?;
        StatResult::parse(&text)
    }
}

// Common implementation for all states
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        let bytes = cmd.serialize()?;
        if !cmd.is_sensitive() {
            tracing::trace!(command = ?cmd, "POP3 >");
        }
        let stream = self.stream.get_mut();
        stream.write_all(&bytes).await?;
        stream.flush().await?;
        read_reply(&mut self.stream).await
    }

    async fn expect_ok(&mut self, cmd: &Command) -> Result<String> {
        match self.send_command(cmd).await? {
            Reply::Ok(text) => Ok(text),
            Reply::Err(text) => Err(Error::ErrResponse(text)),
        }
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer `+OK`.
    pub async fn noop(&mut self) -> Result<()> {
        self.expect_ok(&Command::Noop).await.map(drop)
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the server answers `-ERR`.
    pub async fn quit(mut self) -> Result<()> {
        self.expect_ok(&Command::Quit).await?;
        let _ = self.stream.get_mut().shutdown().await;
        Ok(())
    }
}

async fn read_reply<S>(stream: &mut BufReader<S>) -> Result<Reply>
where
    S: AsyncRead + Unpin,
{
    let mut line = String::new();
    let read = stream.read_line(&mut line).await?;
    if read == 0 {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "server closed the connection",
        )));
    }
    if line.len() > MAX_LINE_LENGTH {
        return Err(Error::Protocol("status line too long".into()));
    }
    tracing::trace!(reply = line.trim_end(), "POP3 <");
    Reply::parse(&line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn login_stat_quit() {
        let mock = Builder::new()
            .read(b"+OK POP3 ready <1896.697170952@dbc.mtview.ca.us>\r\n")
            .write(b"USER mrose\r\n")
            .read(b"+OK mrose is a real hoopy frood\r\n")
            .write(b"PASS secret\r\n")
            .read(b"+OK mrose's maildrop has 2 messages (320 octets)\r\n")
            .write(b"STAT\r\n")
            .read(b"+OK 2 320\r\n")
            .write(b"QUIT\r\n")
            .read(b"+OK dewey POP3 server signing off\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        assert!(client.greeting().starts_with("POP3 ready"));
        let mut client = client.login("mrose", "secret").await.unwrap();
        let stat = client.stat().await.unwrap();
        assert_eq!(stat, StatResult { count: 2, size: 320 });
        client.quit().await.unwrap();
    }

    #[tokio::test]
    async fn wrong_password_is_auth_rejected() {
        let mock = Builder::new()
            .read(b"+OK ready\r\n")
            .write(b"USER bob\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS nope\r\n")
            .read(b"-ERR [AUTH] Authentication failed.\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let err = client.login("bob", "nope").await.unwrap_err();
        assert!(err.is_auth_rejected());
    }

    #[tokio::test]
    async fn unknown_user_is_auth_rejected() {
        let mock = Builder::new()
            .read(b"+OK ready\r\n")
            .write(b"USER ghost\r\n")
            .read(b"-ERR no such mailbox\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let err = client.login("ghost", "x").await.unwrap_err();
        assert!(matches!(err, Error::AuthRejected(text) if text == "no such mailbox"));
    }

    #[tokio::test]
    async fn err_greeting() {
        let mock = Builder::new().read(b"-ERR server busy\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::ErrResponse(_)));
    }

    #[tokio::test]
    async fn stat_err_is_not_auth_rejection() {
        let mock = Builder::new()
            .read(b"+OK ready\r\n")
            .write(b"USER bob\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS pw\r\n")
            .read(b"+OK\r\n")
            .write(b"STAT\r\n")
            .read(b"-ERR maildrop locked\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let mut client = client.login("bob", "pw").await.unwrap();
        let err = client.stat().await.unwrap_err();
        assert!(matches!(err, Error::ErrResponse(_)));
        assert!(!err.is_auth_rejected());
    }

    #[tokio::test]
    async fn hangup_is_disconnect() {
        let (client_io, server_io) = tokio::io::duplex(64);
        drop(server_io);
        let err = Client::from_stream(client_io).await.unwrap_err();
        assert!(err.is_disconnect());
    }
}
