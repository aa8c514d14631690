//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{AuthMechanism, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::io;
use std::marker::PhantomData;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Longest reply line accepted before the server is considered broken.
const MAX_LINE_LENGTH: usize = 4096;

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<S, State> {
    stream: BufReader<S>,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

impl<S, State> Client<S, State> {
    /// Returns the server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut stream = BufReader::new(stream);
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::smtp_error(
                greeting.code.as_u16(),
                greeting.message_text(),
            ));
        }

        // Extract hostname from greeting (first word after code)
        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(&Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;
        ensure_success(&reply)?;

        self.server_info.set_extensions(reply.message.iter());
        Ok(self)
    }

    /// Authenticates with the first plaintext mechanism the server offers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthRejected`] if the server refuses the credentials and
    /// [`Error::NotSupported`] if no plaintext mechanism is advertised.
    pub async fn authenticate(
        self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        match AuthMechanism::choose_plaintext(&self.server_info.auth_mechanisms()) {
            Some(AuthMechanism::Login) => self.auth_login(username, password).await,
            Some(_) => self.auth_plain(username, password).await,
            None => Err(Error::NotSupported("AUTH PLAIN or AUTH LOGIN".into())),
        }
    }

    /// Authenticates using PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        // Build PLAIN response: \0username\0password
        let credentials = format!("\0{username}\0{password}");

        let reply = self
            .send_command(&Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(BASE64.encode(credentials.as_bytes())),
            })
            .await?;
        ensure_authenticated(&reply)?;

        Ok(self.into_state())
    }

    /// Authenticates using LOGIN mechanism (username and password prompts).
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let mut reply = self
            .send_command(&Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            })
            .await?;

        for answer in [username, password] {
            if reply.code != ReplyCode::AUTH_CONTINUE {
                break;
            }
            reply = self
                .send_command(&Command::AuthResponse(BASE64.encode(answer.as_bytes())))
                .await?;
        }
        ensure_authenticated(&reply)?;

        Ok(self.into_state())
    }
}

impl Client<SmtpStream, Connected> {
    /// Upgrades the connection to TLS using STARTTLS, then repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported or if the upgrade fails.
    pub async fn starttls(mut self, server_hostname: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.send_command(&Command::StartTls).await?;
        ensure_success(&reply)?;

        // Anything still buffered was sent before the handshake and must be dropped
        let stream = self.stream.into_inner().upgrade_to_tls(server_hostname).await?;
        tracing::debug!(server = server_hostname, "STARTTLS upgrade complete");

        let client = Self {
            stream: BufReader::new(stream),
            server_info: ServerInfo {
                hostname: self.server_info.hostname,
                ..ServerInfo::default()
            },
            _state: PhantomData,
        };
        client.ehlo(client_hostname).await
    }
}

// Common implementation for all states
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        if !cmd.is_sensitive() {
            tracing::trace!(command = ?cmd, "SMTP >");
        }
        let stream = self.stream.get_mut();
        stream.write_all(&cmd.serialize()).await?;
        stream.flush().await?;
        read_reply(&mut self.stream).await
    }

    /// Sends NOOP to confirm the session is still usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer 250.
    pub async fn noop(&mut self) -> Result<()> {
        let reply = self.send_command(&Command::Noop).await?;
        ensure_success(&reply)
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }

        let _ = self.stream.get_mut().shutdown().await;
        Ok(())
    }
}

async fn read_reply<S>(stream: &mut BufReader<S>) -> Result<Reply>
where
    S: AsyncRead + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        let read = stream.read_line(&mut line).await?;
        if read == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )));
        }
        if line.len() > MAX_LINE_LENGTH {
            return Err(Error::Protocol("reply line too long".into()));
        }

        let line = line.trim_end().to_string();
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

fn ensure_success(reply: &Reply) -> Result<()> {
    if reply.is_success() {
        Ok(())
    } else {
        Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()))
    }
}

fn ensure_authenticated(reply: &Reply) -> Result<()> {
    match reply.code {
        code if code.is_success() => Ok(()),
        // Unknown mechanism or a temporary server failure, not a verdict on the credentials
        code if code.is_transient()
            || code == ReplyCode::NOT_IMPLEMENTED
            || code == ReplyCode::PARAMETER_NOT_IMPLEMENTED =>
        {
            Err(Error::smtp_error(code.as_u16(), reply.message_text()))
        }
        code => Err(Error::AuthRejected {
            code: code.as_u16(),
            message: reply.message_text(),
        }),
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
    async fn plain_login_and_quit() {
        let mock = Builder::new()
            .read(b"220 mx.example.com ESMTP ready\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-mx.example.com\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 1000\r\n")
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 2.7.0 Accepted\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 Bye\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        assert_eq!(client.server_info().hostname, "mx.example.com");
        let client = client.ehlo("localhost").await.unwrap();
        assert_eq!(
            client.server_info().auth_mechanisms(),
            vec![AuthMechanism::Plain, AuthMechanism::Login]
        );
        let client = client.authenticate("user", "pass").await.unwrap();
        client.quit().await.unwrap();
    }

    #[tokio::test]
    async fn login_mechanism_when_plain_missing() {
        let mock = Builder::new()
            .read(b"220 mx ready\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-mx\r\n250 AUTH LOGIN\r\n")
            .write(b"AUTH LOGIN\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"334 UGFzc3dvcmQ6\r\n")
            .write(b"cGFzcw==\r\n")
            .read(b"235 ok\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        client.authenticate("user", "pass").await.unwrap();
    }

    #[tokio::test]
    async fn rejected_credentials() {
        let mock = Builder::new()
            .read(b"220 mx ready\r\n")
            .write(b"AUTH PLAIN AHVzZXIAd3Jvbmc=\r\n")
            .read(b"535 5.7.8 Username and Password not accepted\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let err = client.auth_plain("user", "wrong").await.unwrap_err();
        assert!(err.is_auth_rejected());
        assert!(matches!(err, Error::AuthRejected { code: 535, .. }));
    }

    #[tokio::test]
    async fn unsupported_mechanism_is_not_a_rejection() {
        let mock = Builder::new()
            .read(b"220 mx ready\r\n")
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"504 5.5.4 Unrecognized authentication type\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let err = client.auth_plain("user", "pass").await.unwrap_err();
        assert!(!err.is_auth_rejected());
    }

    #[tokio::test]
    async fn temporary_failure_is_not_a_rejection() {
        let mock = Builder::new()
            .read(b"220 mx ready\r\n")
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"454 4.7.0 Temporary authentication failure\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let err = client.auth_plain("user", "pass").await.unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 454, .. }));
    }

    #[tokio::test]
    async fn no_plaintext_mechanism_advertised() {
        let mock = Builder::new()
            .read(b"220 mx ready\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-mx\r\n250 AUTH XOAUTH2\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let err = client.authenticate("user", "pass").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn greeting_rejection() {
        let mock = Builder::new().read(b"554 No SMTP service here\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 554, .. }));
    }

    #[tokio::test]
    async fn eof_during_greeting_is_disconnect() {
        let (client_side, server_side) = tokio::io::duplex(64);
        drop(server_side);
        let err = Client::from_stream(client_side).await.unwrap_err();
        assert!(err.is_disconnect());
    }
}
