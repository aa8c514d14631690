//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, MailboxSummary, Selected};
use crate::Result;
use crate::command::Command;
use crate::response::Response;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox for read-write access.
    ///
    /// Consumes self and returns a selected client on success.
    pub async fn select(
        mut self,
        mailbox: &str,
    ) -> Result<(Client<S, Selected>, MailboxSummary)> {
        let responses = self
            .execute(&Command::Select {
                mailbox: mailbox.to_string(),
            })
            .await?;

        let summary = responses
            .iter()
            .fold(MailboxSummary::default(), |mut summary, response| {
                match response {
                    Response::Exists(n) => summary.exists = *n,
                    Response::Recent(n) => summary.recent = *n,
                    _ => {}
                }
                summary
            });

        Ok((self.transition(), summary))
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

    use crate::{Client, Error};

    #[tokio::test]
    async fn test_select_reports_counts() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user pass\r\n")
            .read(b"A0000 OK done\r\n")
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* FLAGS (\\Answered \\Seen)\r\n")
            .read(b"* 42 EXISTS\r\n* 2 RECENT\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
            .read(b"A0001 OK [READ-WRITE] SELECT completed\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("user", "pass").await.unwrap();
        let (_client, summary) = client.select("INBOX").await.unwrap();
        assert_eq!(summary.exists, 42);
        assert_eq!(summary.recent, 2);
    }

    #[tokio::test]
    async fn test_select_missing_mailbox() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user pass\r\n")
            .read(b"A0000 OK done\r\n")
            .write(b"A0001 SELECT Nope\r\n")
            .read(b"A0001 NO Mailbox doesn't exist\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("user", "pass").await.unwrap();
        let err = client.select("Nope").await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
    }
}
