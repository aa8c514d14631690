//! Domain → endpoint table.

use std::collections::BTreeMap;
use std::path::Path;

use super::{MailProtocol, ProviderEndpoint};
use crate::{Error, Result};

/// Endpoints of one provider, keyed by protocol.
pub type ProviderEndpoints = BTreeMap<MailProtocol, ProviderEndpoint>;

/// Immutable table of known mail providers.
///
/// Domains are stored lowercase and matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderEndpoints>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderRegistry {
    /// The built-in table: Gmail, Yahoo, Hotmail and Outlook.
    ///
    /// SMTP entries point at the submission port and rely on STARTTLS.
    #[must_use]
    pub fn builtin() -> Self {
        let entry = |smtp: &str, imap: &str, pop3: &str| {
            BTreeMap::from([
                (MailProtocol::Smtp, ProviderEndpoint::new(smtp, 587, false)),
                (MailProtocol::Imap, ProviderEndpoint::new(imap, 993, true)),
                (MailProtocol::Pop3, ProviderEndpoint::new(pop3, 995, true)),
            ])
        };

        let providers = BTreeMap::from([
            (
                "gmail.com".to_string(),
                entry("smtp.gmail.com", "imap.gmail.com", "pop.gmail.com"),
            ),
            (
                "yahoo.com".to_string(),
                entry(
                    "smtp.mail.yahoo.com",
                    "imap.mail.yahoo.com",
                    "pop.mail.yahoo.com",
                ),
            ),
            (
                "hotmail.com".to_string(),
                entry(
                    "smtp-mail.outlook.com",
                    "outlook.office365.com",
                    "outlook.office365.com",
                ),
            ),
            (
                "outlook.com".to_string(),
                entry(
                    "smtp-mail.outlook.com",
                    "outlook.office365.com",
                    "outlook.office365.com",
                ),
            ),
        ]);

        Self { providers }
    }

    /// Builds a registry from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] for an empty domain, an empty host or port 0.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, ProviderEndpoints)>,
    ) -> Result<Self> {
        let mut providers = BTreeMap::new();
        for (domain, endpoints) in entries {
            let domain = domain.trim().to_ascii_lowercase();
            if domain.is_empty() {
                return Err(Error::Provider("empty domain".to_string()));
            }
            for (protocol, endpoint) in &endpoints {
                if endpoint.host.trim().is_empty() || endpoint.port == 0 {
                    return Err(Error::Provider(format!(
                        "{domain}/{protocol}: host and a non-zero port are required"
                    )));
                }
            }
            providers.insert(domain, endpoints);
        }
        Ok(Self { providers })
    }

    /// Parses a JSON table shaped like
    /// `{"example.com": {"smtp": {"host": "...", "port": 587, "encrypted": false}}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or an entry is invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, ProviderEndpoints> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Loads a JSON table from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Endpoints for a domain; empty when the domain is unknown.
    #[must_use]
    pub fn lookup(&self, domain: &str) -> ProviderEndpoints {
        self.providers
            .get(&domain.trim().to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Endpoints for the domain of an address (the part after `@`).
    #[must_use]
    pub fn lookup_address(&self, address: &str) -> ProviderEndpoints {
        domain_of(address)
            .map(|domain| self.lookup(domain))
            .unwrap_or_default()
    }

    /// Single endpoint for a domain and protocol.
    #[must_use]
    pub fn endpoint(&self, domain: &str, protocol: MailProtocol) -> Option<&ProviderEndpoint> {
        self.providers
            .get(&domain.trim().to_ascii_lowercase())?
            .get(&protocol)
    }

    /// Returns true if the domain is configured.
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        self.providers
            .contains_key(&domain.trim().to_ascii_lowercase())
    }

    /// Configured domains in sorted order.
    #[must_use]
    pub fn domains(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

/// The segment after the first `@`, if any.
#[must_use]
pub fn domain_of(address: &str) -> Option<&str> {
    address.split('@').nth(1)
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
    fn test_builtin_lookup_is_case_insensitive() {
        let registry = ProviderRegistry::builtin();
        let endpoints = registry.lookup("GMail.COM");
        assert_eq!(endpoints.len(), 3);
        assert_eq!(
            endpoints[&MailProtocol::Imap],
            ProviderEndpoint::new("imap.gmail.com", 993, true)
        );
        assert!(!endpoints[&MailProtocol::Smtp].encrypted);
    }

    #[test]
    fn test_unknown_domain_is_empty() {
        let registry = ProviderRegistry::builtin();
        assert!(registry.lookup("example.org").is_empty());
        assert!(registry.lookup("").is_empty());
        assert!(registry.endpoint("example.org", MailProtocol::Smtp).is_none());
    }

    #[test]
    fn test_lookup_address() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.lookup_address("someone@Outlook.com").len(), 3);
        assert!(registry.lookup_address("no-at-sign").is_empty());
        assert!(registry.lookup_address("trailing@").is_empty());
    }

    #[test]
    fn test_domains_sorted() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(
            registry.domains(),
            vec!["gmail.com", "hotmail.com", "outlook.com", "yahoo.com"]
        );
    }

    #[test]
    fn test_from_json_replaces_table() {
        let registry = ProviderRegistry::from_json_str(
            r#"{"Example.NET": {"pop3": {"host": "pop.example.net", "port": 110, "encrypted": false}}}"#,
        )
        .unwrap();
        assert_eq!(registry.domains(), vec!["example.net"]);
        assert!(registry.contains("example.net"));
        assert_eq!(
            registry.endpoint("example.net", MailProtocol::Pop3).unwrap().port,
            110
        );
        assert!(registry.endpoint("example.net", MailProtocol::Smtp).is_none());
        assert!(!registry.contains("gmail.com"));
    }

    #[test]
    fn test_from_json_rejects_bad_entries() {
        let zero_port = r#"{"a.com": {"smtp": {"host": "smtp.a.com", "port": 0, "encrypted": false}}}"#;
        assert!(matches!(
            ProviderRegistry::from_json_str(zero_port),
            Err(Error::Provider(_))
        ));

        let unknown_protocol = r#"{"a.com": {"ftp": {"host": "x", "port": 21, "encrypted": false}}}"#;
        assert!(matches!(
            ProviderRegistry::from_json_str(unknown_protocol),
            Err(Error::Serde(_))
        ));
    }

    #[test]
    fn test_domain_of_takes_segment_after_first_at() {
        assert_eq!(domain_of("a@b.com"), Some("b.com"));
        assert_eq!(domain_of("a@b@c"), Some("b"));
        assert_eq!(domain_of("plain"), None);
    }
}
