//! POP3 command definitions.

use crate::error::{Error, Result};

/// POP3 command subset used by the probe client.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// USER name
    User(String),
    /// PASS secret
    Pass(String),
    /// STAT - maildrop size
    Stat,
    /// NOOP
    Noop,
    /// QUIT - enter update state and close
    Quit,
}

impl Command {
    /// Serializes the command to wire format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an argument contains CR or LF.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let line = match self {
            Self::User(name) => format!("USER {}", single_line(name)?),
            Self::Pass(secret) => format!("PASS {}", single_line(secret)?),
            Self::Stat => "STAT".to_string(),
            Self::Noop => "NOOP".to_string(),
            Self::Quit => "QUIT".to_string(),
        };
        let mut bytes = line.into_bytes();
        bytes.extend_from_slice(b"\r\n");
        Ok(bytes)
    }

    /// Returns true if the command carries a secret that must not be logged.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        matches!(self, Self::Pass(_))
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(name) => write!(f, "USER {name}"),
            Self::Pass(_) => f.write_str("PASS <redacted>"),
            Self::Stat => f.write_str("STAT"),
            Self::Noop => f.write_str("NOOP"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

fn single_line(arg: &str) -> Result<&str> {
    if arg.contains(['\r', '\n']) {
        return Err(Error::InvalidArgument(
            "CR and LF are not allowed in POP3 arguments".into(),
        ));
    }
    Ok(arg)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serialize_commands() {
        assert_eq!(
            Command::User("bob@example.com".into()).serialize().unwrap(),
            b"USER bob@example.com\r\n"
        );
        assert_eq!(
            Command::Pass("pa ss".into()).serialize().unwrap(),
            b"PASS pa ss\r\n"
        );
        assert_eq!(Command::Stat.serialize().unwrap(), b"STAT\r\n");
        assert_eq!(Command::Quit.serialize().unwrap(), b"QUIT\r\n");
    }

    #[test]
    fn injected_line_break_rejected() {
        let err = Command::Pass("x\r\nDELE 1".into()).serialize().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn pass_is_redacted() {
        let cmd = Command::Pass("hunter2".into());
        assert!(cmd.is_sensitive());
        assert_eq!(format!("{cmd:?}"), "PASS <redacted>");
        assert!(!Command::User("bob".into()).is_sensitive());
    }
}
