//! # credprobe-imap
//!
//! A minimal IMAP client (RFC 9051 / RFC 3501) covering the commands needed
//! to prove that a set of credentials opens a usable mailbox session.
//!
//! ## Features
//!
//! - **Type-state connection management**: `NotAuthenticated` → `Authenticated`
//!   → `Selected`, enforced at compile time
//! - **Commands**: CAPABILITY, LOGIN, SELECT, CLOSE, NOOP, LOGOUT
//! - **TLS via rustls**: implicit TLS without an OpenSSL dependency
//! - **Literal-aware framing**: greetings and untagged data carrying `{n}`
//!   literals are read completely before parsing
//!
//! ## Quick Start
//!
//! ```ignore
//! use credprobe_imap::{Client, Config, Security};
//!
//! #[tokio::main]
//! async fn main() -> credprobe_imap::Result<()> {
//!     let config = Config::builder("imap.example.com")
//!         .security(Security::Implicit)
//!         .build();
//!     let client = Client::connect(&config).await?;
//!
//!     let client = client.login("user@example.com", "password").await?;
//!     let (client, mailbox) = client.select("INBOX").await?;
//!     println!("Messages: {}", mailbox.exists);
//!
//!     client.close().await?.logout().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod response;

pub use command::{Command, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FramedStream, ImapStream, MailboxSummary,
    NotAuthenticated, Security, Selected,
};
pub use error::{Error, Result};
pub use response::{Response, Status};
