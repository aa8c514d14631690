//! # credprobe-core
//!
//! Verification engine and job bookkeeping for credprobe.
//!
//! This crate provides:
//! - **Provider registry** - mail server endpoints keyed by address domain
//! - **Email verifier** - SMTP, IMAP and POP3 login probes
//! - **Proxy verifier** - HTTP/HTTPS request probes and SOCKS4/SOCKS5 reachability
//! - **Result store** - single-check records and batch job snapshots
//! - **Batch orchestration** - background jobs with pollable progress
//! - **Check service** - the facade the HTTP layer talks to

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod batch;
mod config;
mod error;
pub mod model;
pub mod provider;
pub mod service;
pub mod store;
pub mod verify;

pub use batch::{BatchJob, BatchRunner, JobStatus};
pub use config::ProbeConfig;
pub use error::{Error, Result};
pub use model::{
    CheckKind, CheckOutcome, CheckRecord, CheckStatus, EmailCheckRequest, EmailItem, PortSpec,
    ProxyCheckRequest, ProxyItem, ProxyKind,
};
pub use provider::{MailProtocol, ProviderEndpoint, ProviderRegistry};
pub use service::{CheckService, CheckStats};
pub use store::{CheckStore, MemoryStore};
pub use verify::{Checker, NetworkChecker};
