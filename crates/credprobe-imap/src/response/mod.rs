//! IMAP response parsing.
//!
//! Only the response shapes a login probe meets are modelled: status lines
//! (tagged and untagged), CAPABILITY data, EXISTS/RECENT counts and
//! continuation requests. Everything else is kept as [`Response::Other`].

use crate::{Error, Result};

/// Status condition of a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed.
    No,
    /// Command was malformed or not allowed.
    Bad,
    /// Connection is already authenticated.
    PreAuth,
    /// Server is closing the connection.
    Bye,
}

impl Status {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }
}

/// A single parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged completion of a command.
    Tagged {
        /// Command tag.
        tag: String,
        /// Completion status.
        status: Status,
        /// Bracketed response code, without brackets.
        code: Option<String>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged status (`* OK`, `* BYE`, greeting).
    Status {
        /// Status condition.
        status: Status,
        /// Bracketed response code, without brackets.
        code: Option<String>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<String>),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `+ ...`
    Continuation(String),
    /// Any other untagged data.
    Other(String),
}

impl Response {
    /// Parses one framed response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for an empty line or a tagged line that
    /// does not carry OK, NO or BAD.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim_end_matches(['\r', '\n']);

        let (first, rest) = split_word(line);
        match first {
            "" => Err(Error::Protocol("empty response line".to_string())),
            "+" => Ok(Self::Continuation(rest.to_string())),
            "*" => Ok(parse_untagged(rest)),
            tag => {
                let (word, rest) = split_word(rest);
                match Status::parse(word) {
                    Some(status @ (Status::Ok | Status::No | Status::Bad)) => {
                        let (code, text) = split_code(rest);
                        Ok(Self::Tagged {
                            tag: tag.to_string(),
                            status,
                            code,
                            text,
                        })
                    }
                    _ => Err(Error::Protocol(format!("invalid tagged response: {line}"))),
                }
            }
        }
    }

    /// Returns the capabilities advertised by this response, either as
    /// CAPABILITY data or as a `[CAPABILITY ...]` response code.
    #[must_use]
    pub fn capabilities(&self) -> Option<Vec<String>> {
        match self {
            Self::Capability(caps) => Some(caps.clone()),
            Self::Status {
                code: Some(code), ..
            }
            | Self::Tagged {
                code: Some(code), ..
            } => {
                let (word, rest) = split_word(code);
                word.eq_ignore_ascii_case("CAPABILITY")
                    .then(|| split_atoms(rest))
            }
            _ => None,
        }
    }
}

fn parse_untagged(rest: &str) -> Response {
    let (word, tail) = split_word(rest);

    if let Some(status) = Status::parse(word) {
        let (code, text) = split_code(tail);
        return Response::Status { status, code, text };
    }

    if word.eq_ignore_ascii_case("CAPABILITY") {
        return Response::Capability(split_atoms(tail));
    }

    if let Ok(n) = word.parse::<u32>() {
        let (kind, _) = split_word(tail);
        if kind.eq_ignore_ascii_case("EXISTS") {
            return Response::Exists(n);
        }
        if kind.eq_ignore_ascii_case("RECENT") {
            return Response::Recent(n);
        }
    }

    Response::Other(rest.to_string())
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(' ') {
        Some((word, rest)) => (word, rest),
        None => (s, ""),
    }
}

fn split_atoms(s: &str) -> Vec<String> {
    s.split_ascii_whitespace().map(str::to_string).collect()
}

/// Splits a leading `[code]` from status text.
fn split_code(s: &str) -> (Option<String>, String) {
    if let Some(inner) = s.strip_prefix('[')
        && let Some((code, text)) = inner.split_once(']')
    {
        return (Some(code.to_string()), text.trim_start().to_string());
    }
    (None, s.to_string())
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
    use proptest::prelude::*;

    #[test]
    fn greeting_with_capability_code() {
        let resp = Response::parse(b"* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] Dovecot ready.\r\n")
            .unwrap();
        assert_eq!(
            resp,
            Response::Status {
                status: Status::Ok,
                code: Some("CAPABILITY IMAP4rev1 AUTH=PLAIN".into()),
                text: "Dovecot ready.".into(),
            }
        );
        assert_eq!(
            resp.capabilities().unwrap(),
            vec!["IMAP4rev1".to_string(), "AUTH=PLAIN".to_string()]
        );
    }

    #[test]
    fn tagged_no_with_code() {
        let resp =
            Response::parse(b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n").unwrap();
        assert_eq!(
            resp,
            Response::Tagged {
                tag: "A0001".into(),
                status: Status::No,
                code: Some("AUTHENTICATIONFAILED".into()),
                text: "Invalid credentials".into(),
            }
        );
    }

    #[test]
    fn untagged_data() {
        assert_eq!(Response::parse(b"* 172 EXISTS\r\n").unwrap(), Response::Exists(172));
        assert_eq!(Response::parse(b"* 1 recent\r\n").unwrap(), Response::Recent(1));
        assert_eq!(
            Response::parse(b"* CAPABILITY IMAP4rev1 IDLE\r\n").unwrap(),
            Response::Capability(vec!["IMAP4rev1".into(), "IDLE".into()])
        );
        assert_eq!(
            Response::parse(b"* FLAGS (\\Seen)\r\n").unwrap(),
            Response::Other("FLAGS (\\Seen)".into())
        );
        assert_eq!(
            Response::parse(b"* BYE shutting down\r\n").unwrap(),
            Response::Status {
                status: Status::Bye,
                code: None,
                text: "shutting down".into(),
            }
        );
    }

    #[test]
    fn continuation() {
        assert_eq!(
            Response::parse(b"+ Ready for literal\r\n").unwrap(),
            Response::Continuation("Ready for literal".into())
        );
    }

    #[test]
    fn invalid_lines() {
        assert!(Response::parse(b"\r\n").is_err());
        assert!(Response::parse(b"A0001 MAYBE\r\n").is_err());
        assert!(Response::parse(b"A0001 BYE\r\n").is_err());
    }

    proptest! {
        #[test]
        fn parse_never_panics(raw in proptest::collection::vec(any::<u8>(), 0..200)) {
            let _ = Response::parse(&raw);
        }

        #[test]
        fn exists_count_round_trips(n in any::<u32>()) {
            let line = format!("* {n} EXISTS\r\n");
            prop_assert_eq!(Response::parse(line.as_bytes()).unwrap(), Response::Exists(n));
        }
    }
}
