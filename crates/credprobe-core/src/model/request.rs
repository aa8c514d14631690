//! Check requests and their loosely-typed wire forms.
//!
//! Items arrive as JSON from callers that may omit fields or send ports as
//! strings. [`EmailItem`] and [`ProxyItem`] accept anything shaped like an
//! object; turning them into typed requests either succeeds or produces the
//! `INVALID` outcome that stands in for the check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CheckOutcome;
use crate::provider::MailProtocol;

/// Kind of proxy to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    /// Plain HTTP proxy.
    Http,
    /// HTTP proxy probed with an HTTPS target (CONNECT).
    Https,
    /// SOCKS version 4.
    Socks4,
    /// SOCKS version 5.
    Socks5,
}

impl ProxyKind {
    /// Uppercase name used in outcome messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Https => "HTTPS",
            Self::Socks4 => "SOCKS4",
            Self::Socks5 => "SOCKS5",
        }
    }

    /// Returns true for SOCKS4 and SOCKS5.
    #[must_use]
    pub const fn is_socks(self) -> bool {
        matches!(self, Self::Socks4 | Self::Socks5)
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks4 => "socks4",
            Self::Socks5 => "socks5",
        })
    }
}

impl FromStr for ProxyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            "socks4" => Ok(Self::Socks4),
            "socks5" => Ok(Self::Socks5),
            _ => Err(format!("Unsupported proxy type: {s}")),
        }
    }
}

/// A port exactly as the caller sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    /// JSON number (possibly fractional or out of range).
    Number(serde_json::Number),
    /// JSON string.
    Text(String),
}

impl PortSpec {
    /// Validates the port.
    ///
    /// # Errors
    ///
    /// Returns "Port must be a number" when the value is not an integer and
    /// "Invalid port number" when it is outside 1..=65535.
    pub fn resolve(&self) -> Result<u16, &'static str> {
        let value = match self {
            Self::Number(n) => n.as_i64().ok_or("Port must be a number")?,
            Self::Text(s) => s.trim().parse::<i64>().map_err(|_| "Port must be a number")?,
        };
        u16::try_from(value)
            .ok()
            .filter(|port| *port != 0)
            .ok_or("Invalid port number")
    }
}

impl From<u16> for PortSpec {
    fn from(port: u16) -> Self {
        Self::Number(port.into())
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Typed email check.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailCheckRequest {
    /// Full address; also the login name.
    pub address: String,
    /// Password.
    pub secret: String,
    /// Protocol to log in with.
    pub protocol: MailProtocol,
}

impl fmt::Debug for EmailCheckRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailCheckRequest")
            .field("address", &self.address)
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

/// Typed proxy check.
#[derive(Clone, PartialEq)]
pub struct ProxyCheckRequest {
    /// Proxy host name or address.
    pub host: String,
    /// Port as received; validated by the verifier.
    pub port: PortSpec,
    /// Proxy kind.
    pub kind: ProxyKind,
    /// Optional proxy user.
    pub username: Option<String>,
    /// Optional proxy password.
    pub secret: Option<String>,
}

impl ProxyCheckRequest {
    /// `host:port` as received.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ProxyCheckRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCheckRequest")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("kind", &self.kind)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Email check as received over the wire.
#[derive(Clone, Default, Deserialize)]
pub struct EmailItem {
    /// Address.
    #[serde(default)]
    pub email: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
    /// Protocol name; `smtp` when absent.
    #[serde(default)]
    pub protocol: Option<String>,
}

impl EmailItem {
    /// Returns true if the address or password is absent or empty.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        is_blank(self.email.as_deref()) || is_blank(self.password.as_deref())
    }

    /// The address, or an empty string.
    #[must_use]
    pub fn target(&self) -> String {
        self.email.clone().unwrap_or_default()
    }

    /// Protocol name as received, defaulting to `smtp`.
    #[must_use]
    pub fn protocol_name(&self) -> &str {
        self.protocol.as_deref().unwrap_or("smtp")
    }

    /// Converts to a typed request.
    ///
    /// # Errors
    ///
    /// Returns the `INVALID` outcome for missing fields or an unknown protocol.
    pub fn into_request(self) -> Result<EmailCheckRequest, CheckOutcome> {
        if self.is_incomplete() {
            return Err(CheckOutcome::invalid("Email and password required"));
        }
        let protocol = self
            .protocol_name()
            .parse::<MailProtocol>()
            .map_err(CheckOutcome::invalid)?;

        Ok(EmailCheckRequest {
            address: self.email.unwrap_or_default(),
            secret: self.password.unwrap_or_default(),
            protocol,
        })
    }
}

impl fmt::Debug for EmailItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailItem")
            .field("email", &self.email)
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

/// Proxy check as received over the wire.
#[derive(Clone, Default, Deserialize)]
pub struct ProxyItem {
    /// Proxy host.
    #[serde(default)]
    pub host: Option<String>,
    /// Proxy port, number or string.
    #[serde(default)]
    pub port: Option<PortSpec>,
    /// Proxy kind name; `http` when absent.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Optional proxy user.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional proxy password.
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyItem {
    /// Returns true if the host or port is absent or empty.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        is_blank(self.host.as_deref())
            || match &self.port {
                None => true,
                Some(PortSpec::Text(s)) => s.trim().is_empty(),
                Some(PortSpec::Number(_)) => false,
            }
    }

    /// `host:port` as received.
    #[must_use]
    pub fn target(&self) -> String {
        let host = self.host.as_deref().unwrap_or_default();
        match &self.port {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Proxy kind name as received, defaulting to `http`.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        self.kind.as_deref().unwrap_or("http")
    }

    /// Converts to a typed request.
    ///
    /// Port range and empty hosts are left to the verifier.
    ///
    /// # Errors
    ///
    /// Returns the `INVALID` outcome for a missing host or port, or an
    /// unknown proxy type.
    pub fn into_request(self) -> Result<ProxyCheckRequest, CheckOutcome> {
        let kind = self
            .kind_name()
            .parse::<ProxyKind>()
            .map_err(CheckOutcome::invalid)?;
        let (Some(host), Some(port)) = (self.host, self.port) else {
            return Err(CheckOutcome::invalid("Host and port required"));
        };

        Ok(ProxyCheckRequest {
            host,
            port,
            kind,
            username: self.username.filter(|u| !u.is_empty()),
            secret: self.password.filter(|p| !p.is_empty()),
        })
    }
}

impl fmt::Debug for ProxyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyItem")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
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
    use crate::CheckStatus;
    use proptest::prelude::*;
    use serde_json::json;

    fn port(value: serde_json::Value) -> PortSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_port_validation() {
        assert_eq!(port(json!(8080)).resolve(), Ok(8080));
        assert_eq!(port(json!("1080")).resolve(), Ok(1080));
        assert_eq!(port(json!(" 3128 ")).resolve(), Ok(3128));
        assert_eq!(port(json!(0)).resolve(), Err("Invalid port number"));
        assert_eq!(port(json!(70000)).resolve(), Err("Invalid port number"));
        assert_eq!(port(json!(-1)).resolve(), Err("Invalid port number"));
        assert_eq!(port(json!("abc")).resolve(), Err("Port must be a number"));
        assert_eq!(port(json!(80.5)).resolve(), Err("Port must be a number"));
    }

    #[test]
    fn test_proxy_kind_parsing() {
        assert_eq!("SOCKS5".parse::<ProxyKind>().unwrap(), ProxyKind::Socks5);
        assert_eq!(
            "ftp".parse::<ProxyKind>().unwrap_err(),
            "Unsupported proxy type: ftp"
        );
    }

    #[test]
    fn test_email_item_defaults_to_smtp() {
        let item: EmailItem =
            serde_json::from_value(json!({"email": "a@gmail.com", "password": "pw"})).unwrap();
        let request = item.into_request().unwrap();
        assert_eq!(request.protocol, MailProtocol::Smtp);
        assert_eq!(request.address, "a@gmail.com");
    }

    #[test]
    fn test_email_item_invalid_cases() {
        let missing: EmailItem = serde_json::from_value(json!({"email": "a@gmail.com"})).unwrap();
        assert!(missing.is_incomplete());
        let outcome = missing.into_request().unwrap_err();
        assert_eq!(outcome.status, CheckStatus::Invalid);
        assert_eq!(outcome.message, "Email and password required");

        let unknown: EmailItem = serde_json::from_value(
            json!({"email": "a@gmail.com", "password": "pw", "protocol": "ftp"}),
        )
        .unwrap();
        assert_eq!(
            unknown.into_request().unwrap_err().message,
            "Unknown protocol: ftp"
        );
    }

    #[test]
    fn test_proxy_item_conversion() {
        let item: ProxyItem = serde_json::from_value(
            json!({"host": "10.0.0.1", "port": "8080", "type": "HTTPS", "username": ""}),
        )
        .unwrap();
        assert_eq!(item.target(), "10.0.0.1:8080");
        let request = item.into_request().unwrap();
        assert_eq!(request.kind, ProxyKind::Https);
        assert_eq!(request.username, None);

        let missing: ProxyItem = serde_json::from_value(json!({"host": "h"})).unwrap();
        assert!(missing.is_incomplete());
        assert_eq!(
            missing.into_request().unwrap_err().message,
            "Host and port required"
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let request = EmailCheckRequest {
            address: "a@b.c".into(),
            secret: "hunter2".into(),
            protocol: MailProtocol::Imap,
        };
        assert!(!format!("{request:?}").contains("hunter2"));

        let item = ProxyItem {
            password: Some("hunter2".into()),
            ..ProxyItem::default()
        };
        assert!(!format!("{item:?}").contains("hunter2"));
    }

    proptest! {
        #[test]
        fn in_range_ports_resolve(p in 1u16..=u16::MAX) {
            prop_assert_eq!(PortSpec::from(p).resolve(), Ok(p));
            prop_assert_eq!(PortSpec::Text(p.to_string()).resolve(), Ok(p));
        }

        #[test]
        fn out_of_range_ports_are_invalid(p in 65536i64..10_000_000) {
            prop_assert_eq!(PortSpec::Number(p.into()).resolve(), Err("Invalid port number"));
        }
    }
}
