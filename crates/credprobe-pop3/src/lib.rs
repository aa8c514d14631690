//! # credprobe-pop3
//!
//! A small POP3 client (RFC 1939) covering the authorization exchange and a
//! `STAT` in the transaction state, which is all a credential probe needs.
//!
//! ## Quick Start
//!
//! ```ignore
//! use credprobe_pop3::Client;
//! use credprobe_pop3::connection::connect_tls;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> credprobe_pop3::Result<()> {
//!     let stream = connect_tls("pop.example.com", 995, Duration::from_secs(10)).await?;
//!     let client = Client::from_stream(stream).await?;
//!     let mut client = client.login("user@example.com", "password").await?;
//!     let stat = client.stat().await?;
//!     println!("{} messages, {} octets", stat.count, stat.size);
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Authorization ─── login() ───→ Transaction ─── quit()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod reply;

pub use command::Command;
pub use connection::{Authorization, Client, Pop3Stream, Transaction};
pub use error::{Error, Result};
pub use reply::{Reply, StatResult};
