//! EHLO extension keywords relevant to login probing.

/// SMTP extension advertised in an EHLO response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication, with the advertised mechanisms
    Auth(Vec<AuthMechanism>),
    /// SIZE - Maximum message size
    Size(Option<usize>),
    /// PIPELINING - Command pipelining
    Pipelining,
    /// Anything else, kept verbatim
    Unknown(String),
}

impl Extension {
    /// Parses one extension line from an EHLO response.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            // Some older servers still send "AUTH=LOGIN PLAIN"
            "AUTH" => Self::Auth(parts.filter_map(AuthMechanism::parse).collect()),
            kw if kw.starts_with("AUTH=") => {
                let first = keyword.get(5..).and_then(AuthMechanism::parse);
                Self::Auth(
                    first
                        .into_iter()
                        .chain(parts.filter_map(AuthMechanism::parse))
                        .collect(),
                )
            }
            "SIZE" => Self::Size(parts.next().and_then(|s| s.parse().ok())),
            "PIPELINING" => Self::Pipelining,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - legacy plaintext
    Login,
    /// CRAM-MD5 - challenge-response
    CramMd5,
    /// `XOAUTH2` - `OAuth2` (Google/Microsoft)
    XOAuth2,
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" => Some(Self::CramMd5),
            "XOAUTH2" => Some(Self::XOAuth2),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
            Self::XOAuth2 => "XOAUTH2",
        }
    }

    /// Picks the plaintext mechanism to use for an advertised set.
    ///
    /// PLAIN wins when advertised or when the server advertised nothing.
    /// Returns `None` when only non-plaintext mechanisms are on offer.
    #[must_use]
    pub fn choose_plaintext(advertised: &[Self]) -> Option<Self> {
        if advertised.is_empty() || advertised.contains(&Self::Plain) {
            Some(Self::Plain)
        } else if advertised.contains(&Self::Login) {
            Some(Self::Login)
        } else {
            None
        }
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
    fn parse_starttls_any_case() {
        assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn parse_auth_list() {
        assert_eq!(
            Extension::parse("AUTH LOGIN PLAIN XOAUTH2"),
            Extension::Auth(vec![
                AuthMechanism::Login,
                AuthMechanism::Plain,
                AuthMechanism::XOAuth2
            ])
        );
    }

    #[test]
    fn parse_legacy_auth_equals() {
        assert_eq!(
            Extension::parse("AUTH=LOGIN PLAIN"),
            Extension::Auth(vec![AuthMechanism::Login, AuthMechanism::Plain])
        );
    }

    #[test]
    fn parse_size() {
        assert_eq!(Extension::parse("SIZE 35882577"), Extension::Size(Some(35_882_577)));
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
    }

    #[test]
    fn parse_unknown_and_empty() {
        assert_eq!(
            Extension::parse("ENHANCEDSTATUSCODES"),
            Extension::Unknown("ENHANCEDSTATUSCODES".into())
        );
        assert!(matches!(Extension::parse(""), Extension::Unknown(_)));
    }

    #[test]
    fn choose_prefers_plain() {
        use AuthMechanism::{CramMd5, Login, Plain, XOAuth2};
        assert_eq!(AuthMechanism::choose_plaintext(&[]), Some(Plain));
        assert_eq!(AuthMechanism::choose_plaintext(&[Login, Plain]), Some(Plain));
        assert_eq!(AuthMechanism::choose_plaintext(&[Login, XOAuth2]), Some(Login));
        assert_eq!(AuthMechanism::choose_plaintext(&[CramMd5, XOAuth2]), None);
    }
}
