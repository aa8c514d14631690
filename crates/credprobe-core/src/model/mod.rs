//! Domain model types.

mod outcome;
mod request;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use outcome::{CheckOutcome, CheckStatus};
pub use request::{
    EmailCheckRequest, EmailItem, PortSpec, ProxyCheckRequest, ProxyItem, ProxyKind,
};

/// What a check or batch is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// Email account credentials.
    Email,
    /// Proxy server.
    Proxy,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Email => "email",
            Self::Proxy => "proxy",
        })
    }
}

impl FromStr for CheckKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "proxy" => Ok(Self::Proxy),
            _ => Err(format!("Unknown check type: {s}")),
        }
    }
}

/// A stored single-check result. Written once, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    /// Monotonic record id.
    pub id: u64,
    /// Email or proxy.
    pub kind: CheckKind,
    /// Address or `host:port`.
    pub target: String,
    /// Protocol (email) or proxy type (proxy) as requested.
    pub detail: String,
    /// What the check found.
    pub outcome: CheckOutcome,
    /// When the check finished.
    pub checked_at: DateTime<Utc>,
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

    #[test]
    fn test_check_kind() {
        assert_eq!("Email".parse::<CheckKind>().unwrap(), CheckKind::Email);
        assert!("ftp".parse::<CheckKind>().is_err());
        assert_eq!(serde_json::to_string(&CheckKind::Proxy).unwrap(), "\"proxy\"");
    }
}
