//! Check outcome types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ProxyKind;
use crate::provider::MailProtocol;

/// Classification of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Credentials accepted or proxy usable.
    Success,
    /// The target answered, but refused or could not be reached.
    Failed,
    /// The request itself was malformed.
    Invalid,
    /// No provider is configured for the request.
    Unsupported,
    /// Something unexpected went wrong.
    Error,
}

/// Result of one email or proxy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Classification.
    pub status: CheckStatus,
    /// Human-readable explanation.
    pub message: String,
    /// Time spent on the successful exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Public address reported by the echo service through a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_ip: Option<String>,
    /// `host:port` of the server that was contacted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Provider domain (email checks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Protocol used (email checks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<MailProtocol>,
    /// Proxy kind (proxy checks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProxyKind>,
    /// Address or `host:port` the check was about (batch items).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl CheckOutcome {
    /// Creates an outcome with only status and message set.
    #[must_use]
    pub fn new(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            elapsed_ms: None,
            observed_ip: None,
            endpoint: None,
            provider: None,
            protocol: None,
            kind: None,
            target: None,
        }
    }

    /// `SUCCESS` outcome.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Success, message)
    }

    /// `FAILED` outcome.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Failed, message)
    }

    /// `INVALID` outcome.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Invalid, message)
    }

    /// `UNSUPPORTED` outcome.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Unsupported, message)
    }

    /// `ERROR` outcome.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Error, message)
    }

    /// Returns true for `SUCCESS`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == CheckStatus::Success
    }

    /// Sets the elapsed time, saturating at `u64::MAX` milliseconds.
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the observed public IP.
    #[must_use]
    pub fn with_observed_ip(mut self, ip: impl Into<String>) -> Self {
        self.observed_ip = Some(ip.into());
        self
    }

    /// Sets the endpoint descriptor.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the provider domain.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the mail protocol.
    #[must_use]
    pub const fn with_protocol(mut self, protocol: MailProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Sets the proxy kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: ProxyKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the check target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
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
    fn test_optional_fields_are_omitted() {
        let json = serde_json::to_value(CheckOutcome::invalid("Invalid email format")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "invalid", "message": "Invalid email format"})
        );
    }

    #[test]
    fn test_full_success_shape() {
        let outcome = CheckOutcome::success("SMTP authentication successful")
            .with_provider("gmail.com")
            .with_protocol(MailProtocol::Smtp)
            .with_endpoint("smtp.gmail.com:587")
            .with_elapsed(Duration::from_millis(1234));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["protocol"], "smtp");
        assert_eq!(json["elapsed_ms"], 1234);
        assert_eq!(json["endpoint"], "smtp.gmail.com:587");
        assert!(outcome.is_success());
    }

    #[test]
    fn test_elapsed_saturates() {
        let outcome = CheckOutcome::success("ok").with_elapsed(Duration::MAX);
        assert_eq!(outcome.elapsed_ms, Some(u64::MAX));
    }
}
