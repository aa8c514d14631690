//! IMAP command builders.

mod tag_generator;

pub use tag_generator::TagGenerator;

use crate::{Error, Result};

/// IMAP command subset used by the probe client.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY - list server capabilities
    Capability,
    /// LOGIN - plaintext authentication
    Login {
        /// Username
        username: String,
        /// Password
        password: String,
    },
    /// SELECT - open a mailbox read-write
    Select {
        /// Mailbox name
        mailbox: String,
    },
    /// CLOSE - leave the selected mailbox
    Close,
    /// NOOP - no operation
    Noop,
    /// LOGOUT - end the session
    Logout,
}

impl Command {
    /// Serializes the command with the given tag, including the trailing CRLF.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a string argument contains CR, LF
    /// or NUL, which cannot travel inside a quoted string.
    pub fn serialize(&self, tag: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username)?;
                buf.push(b' ');
                write_astring(&mut buf, password)?;
            }
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox)?;
            }
            Self::Close => buf.extend_from_slice(b"CLOSE"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
        }

        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }

    /// Short command name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Close => "CLOSE",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login { username, .. } => write!(f, "LOGIN {username} <redacted>"),
            Self::Select { mailbox } => write!(f, "SELECT {mailbox}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Writes an atom when possible, otherwise a quoted string.
fn write_astring(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::InvalidArgument(
            "CR, LF and NUL are not allowed in quoted strings".into(),
        ));
    }

    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
    Ok(())
}

const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
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
    fn login_with_atoms() {
        let cmd = Command::Login {
            username: "user@example.com".into(),
            password: "hunter2".into(),
        };
        assert_eq!(
            cmd.serialize("A0001").unwrap(),
            b"A0001 LOGIN user@example.com hunter2\r\n"
        );
    }

    #[test]
    fn login_quotes_and_escapes() {
        let cmd = Command::Login {
            username: "user".into(),
            password: r#"p"a\ss word"#.into(),
        };
        assert_eq!(
            cmd.serialize("A0001").unwrap(),
            b"A0001 LOGIN user \"p\\\"a\\\\ss word\"\r\n"
        );
    }

    #[test]
    fn empty_password_is_quoted() {
        let cmd = Command::Login {
            username: "user".into(),
            password: String::new(),
        };
        assert_eq!(cmd.serialize("A1").unwrap(), b"A1 LOGIN user \"\"\r\n");
    }

    #[test]
    fn crlf_is_rejected() {
        let cmd = Command::Login {
            username: "user".into(),
            password: "a\r\nA2 LOGOUT".into(),
        };
        assert!(matches!(
            cmd.serialize("A1"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(Command::Capability.serialize("A1").unwrap(), b"A1 CAPABILITY\r\n");
        assert_eq!(
            Command::Select {
                mailbox: "INBOX".into()
            }
            .serialize("A2")
            .unwrap(),
            b"A2 SELECT INBOX\r\n"
        );
        assert_eq!(Command::Close.serialize("A3").unwrap(), b"A3 CLOSE\r\n");
        assert_eq!(Command::Logout.serialize("A4").unwrap(), b"A4 LOGOUT\r\n");
    }

    #[test]
    fn debug_hides_password() {
        let cmd = Command::Login {
            username: "user".into(),
            password: "secret".into(),
        };
        assert_eq!(format!("{cmd:?}"), "LOGIN user <redacted>");
    }
}
