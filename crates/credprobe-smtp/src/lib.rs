//! # credprobe-smtp
//!
//! A small SMTP client that does just enough of RFC 5321 to answer one
//! question: does this server accept these credentials?
//!
//! ## Features
//!
//! - **Type-state connection management**: `AUTH` is only callable before
//!   authentication, and a finished session can only `NOOP` or `QUIT`
//! - **TLS support**: implicit TLS (port 465) and STARTTLS (port 587)
//! - **Authentication**: PLAIN (with initial response) and LOGIN
//! - **Bounded connects**: every connect takes an explicit timeout
//!
//! ## Quick Start
//!
//! ```ignore
//! use credprobe_smtp::Client;
//! use credprobe_smtp::connection::connect;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> credprobe_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587, Duration::from_secs(10)).await?;
//!     let client = Client::from_stream(stream).await?;
//!     let client = client.ehlo("localhost").await?;
//!     let client = client.starttls("smtp.example.com", "localhost").await?;
//!     let client = client.authenticate("user@example.com", "password").await?;
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── authenticate() ───→ Authenticated ─── quit()
//! └──────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{Authenticated, Client, Connected, ServerInfo, SmtpStream};
pub use error::{Error, Result};
pub use types::{AuthMechanism, Extension, Reply, ReplyCode};
