//! POP3 connection management with type-state pattern.

mod client;
mod stream;

pub use client::{Authorization, Client, Transaction};
pub use stream::{Pop3Stream, connect, connect_tls};
