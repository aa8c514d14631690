//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::Command;

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Closes the current mailbox and returns to authenticated state.
    pub async fn close(mut self) -> Result<Client<S, Authenticated>> {
        self.execute(&Command::Close).await?;
        Ok(self.transition())
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
    use tokio_test::io::Builder;

    use crate::Client;

    #[tokio::test]
    async fn test_full_probe_session() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1] ready\r\n")
            .write(b"A0000 LOGIN user pass\r\n")
            .read(b"A0000 OK done\r\n")
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 0 EXISTS\r\nA0001 OK done\r\n")
            .write(b"A0002 NOOP\r\n")
            .read(b"A0002 OK done\r\n")
            .write(b"A0003 CLOSE\r\n")
            .read(b"A0003 OK done\r\n")
            .write(b"A0004 LOGOUT\r\n")
            .read(b"* BYE bye\r\nA0004 OK done\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("user", "pass").await.unwrap();
        let (mut client, summary) = client.select("INBOX").await.unwrap();
        assert_eq!(summary.exists, 0);
        client.noop().await.unwrap();
        client.close().await.unwrap().logout().await.unwrap();
    }
}
