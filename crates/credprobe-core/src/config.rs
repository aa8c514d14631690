//! Probe configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs shared by every verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Bound on DNS resolution plus TCP connect (and TLS handshake).
    pub connect_timeout: Duration,
    /// Bound on the protocol exchange after connecting.
    pub io_timeout: Duration,
    /// Name announced in SMTP `EHLO`.
    pub client_hostname: String,
    /// Mailbox opened by the IMAP probe.
    pub mailbox: String,
    /// Target fetched through HTTP and SOCKS5 proxies.
    pub http_test_url: String,
    /// Target fetched through HTTPS proxies.
    pub https_test_url: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(10),
            client_hostname: "localhost".to_string(),
            mailbox: "INBOX".to_string(),
            http_test_url: "http://httpbin.org/ip".to_string(),
            https_test_url: "https://httpbin.org/ip".to_string(),
        }
    }
}

impl ProbeConfig {
    /// Sets both timeouts to the same value.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.io_timeout = timeout;
        self
    }

    /// Upper bound on a whole email session.
    #[must_use]
    pub fn session_deadline(&self) -> Duration {
        self.connect_timeout + self.io_timeout
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
    fn test_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.mailbox, "INBOX");
        assert_eq!(config.session_deadline(), Duration::from_secs(20));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ProbeConfig =
            serde_json::from_str(r#"{"client_hostname": "probe.example.net"}"#).unwrap();
        assert_eq!(config.client_hostname, "probe.example.net");
        assert_eq!(config.http_test_url, "http://httpbin.org/ip");
    }
}
