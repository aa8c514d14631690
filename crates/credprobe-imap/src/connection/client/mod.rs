//! Type-state IMAP client connection.
//!
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after the greeting
//! - `Authenticated`: After successful LOGIN
//! - `Selected`: After successful SELECT
//!
//! Each state only exposes methods that are valid for that state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::states::{Authenticated, MailboxSummary, NotAuthenticated, Selected};
use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::response::{Response, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
pub struct Client<S, State> {
    stream: FramedStream<S>,
    tag_gen: TagGenerator,
    capabilities: Vec<String>,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the capabilities seen so far.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Checks if the server advertised a capability (case-insensitive).
    #[must_use]
    pub fn has_capability(&self, cap: &str) -> bool {
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case(cap))
    }

    /// Returns true if the server refuses LOGIN on this connection.
    #[must_use]
    pub fn login_disabled(&self) -> bool {
        self.has_capability("LOGINDISABLED")
    }

    /// Sends a CAPABILITY command and updates the stored capabilities.
    pub async fn capability(&mut self) -> Result<&[String]> {
        self.execute(&Command::Capability).await?;
        Ok(&self.capabilities)
    }

    /// Sends a NOOP command.
    pub async fn noop(&mut self) -> Result<()> {
        self.execute(&Command::Noop).await.map(drop)
    }

    /// Gracefully disconnects from the server.
    ///
    /// The server may hang up right after its BYE, so a disconnect while
    /// waiting for the tagged OK still counts as a clean logout.
    pub async fn logout(mut self) -> Result<()> {
        match self.execute(&Command::Logout).await {
            Ok(_) => {}
            Err(e) if e.is_disconnect() => return Ok(()),
            Err(e) => return Err(e),
        }
        self.stream.shutdown().await
    }

    /// Sends a command and waits for its tagged completion.
    ///
    /// Returns the parsed untagged responses on OK. Capability data seen
    /// along the way is recorded.
    async fn execute(&mut self, command: &Command) -> Result<Vec<Response>> {
        let tag = self.tag_gen.next_tag();
        let bytes = command.serialize(&tag)?;
        tracing::trace!(%tag, ?command, "sending IMAP command");
        self.stream.write_command(&bytes).await?;

        let mut untagged = Vec::new();
        for raw in self.stream.read_until_tagged(&tag).await? {
            let response = Response::parse(&raw)?;
            if let Some(caps) = response.capabilities() {
                self.capabilities = caps;
            }
            match response {
                Response::Tagged { status, text, .. } => {
                    tracing::trace!(%tag, ?status, "IMAP command completed");
                    return match status {
                        Status::Ok | Status::PreAuth => Ok(untagged),
                        Status::No => Err(Error::No(text)),
                        Status::Bad => Err(Error::Bad(text)),
                        Status::Bye => Err(Error::Bye(text)),
                    };
                }
                Response::Status {
                    status: Status::Bye,
                    text,
                    ..
                } if !matches!(command, Command::Logout) => return Err(Error::Bye(text)),
                other => untagged.push(other),
            }
        }

        Err(Error::Protocol("missing tagged response".to_string()))
    }

    fn transition<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            _state: PhantomData,
        }
    }
}
