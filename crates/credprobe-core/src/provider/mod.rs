//! Mail provider endpoints.
//!
//! Maps an address domain to the SMTP, IMAP and POP3 servers that accept its
//! logins.

mod registry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use registry::{ProviderEndpoints, ProviderRegistry, domain_of};

/// Mail access protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProtocol {
    /// Submission (login via AUTH).
    Smtp,
    /// Mailbox access (login via LOGIN).
    Imap,
    /// Maildrop access (login via USER/PASS).
    Pop3,
}

impl MailProtocol {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smtp => "smtp",
            Self::Imap => "imap",
            Self::Pop3 => "pop3",
        }
    }

    /// Uppercase name used in outcome messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Smtp => "SMTP",
            Self::Imap => "IMAP",
            Self::Pop3 => "POP3",
        }
    }
}

impl fmt::Display for MailProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MailProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "imap" => Ok(Self::Imap),
            "pop3" => Ok(Self::Pop3),
            _ => Err(format!("Unknown protocol: {s}")),
        }
    }
}

/// One server a provider exposes for a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// True for implicit TLS. A plaintext SMTP endpoint still upgrades with
    /// STARTTLS when the server offers it.
    pub encrypted: bool,
}

impl ProviderEndpoint {
    /// Creates an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, encrypted: bool) -> Self {
        Self {
            host: host.into(),
            port,
            encrypted,
        }
    }

    /// `host:port` descriptor reported in outcomes.
    #[must_use]
    pub fn descriptor(&self) -> String {
        format!("{}:{}", self.host, self.port)
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

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("SMTP".parse::<MailProtocol>().unwrap(), MailProtocol::Smtp);
        assert_eq!(" imap ".parse::<MailProtocol>().unwrap(), MailProtocol::Imap);
        assert_eq!("pop3".parse::<MailProtocol>().unwrap(), MailProtocol::Pop3);
        assert_eq!(
            "ftp".parse::<MailProtocol>().unwrap_err(),
            "Unknown protocol: ftp"
        );
    }

    #[test]
    fn test_protocol_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MailProtocol::Pop3).unwrap(),
            "\"pop3\""
        );
        assert_eq!(MailProtocol::Imap.label(), "IMAP");
    }

    #[test]
    fn test_descriptor() {
        let endpoint = ProviderEndpoint::new("imap.gmail.com", 993, true);
        assert_eq!(endpoint.descriptor(), "imap.gmail.com:993");
    }
}
