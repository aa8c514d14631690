//! POP3 status line parsing.

use crate::error::{Error, Result};

/// A single-line POP3 status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK` with the remaining text.
    Ok(String),
    /// `-ERR` with the remaining text.
    Err(String),
}

impl Reply {
    /// Parses a status line, with or without its trailing CRLF.
    ///
    /// The status indicator is matched case-insensitively since some servers
    /// answer `+ok`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] when the line starts with neither `+OK`
    /// nor `-ERR`.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (status, text) = match line.split_once(' ') {
            Some((status, text)) => (status, text),
            None => (line, ""),
        };

        if status.eq_ignore_ascii_case("+OK") {
            Ok(Self::Ok(text.to_string()))
        } else if status.eq_ignore_ascii_case("-ERR") {
            Ok(Self::Err(text.to_string()))
        } else {
            Err(Error::Protocol(format!("invalid status line: {line}")))
        }
    }

    /// Returns true for `+OK`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns the text after the status indicator.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Ok(text) | Self::Err(text) => text,
        }
    }
}

/// Maildrop listing from `STAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatResult {
    /// Number of messages.
    pub count: u32,
    /// Total size in octets.
    pub size: u64,
}

impl StatResult {
    /// Parses the text of a `+OK nn mm` STAT reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if either number is missing or malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let mut fields = text.split_ascii_whitespace();
        let count = fields.next().and_then(|f| f.parse().ok());
        let size = fields.next().and_then(|f| f.parse().ok());
        match (count, size) {
            (Some(count), Some(size)) => Ok(Self { count, size }),
            _ => Err(Error::Protocol(format!("malformed STAT reply: {text}"))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_status_lines() {
        assert_eq!(
            Reply::parse("+OK POP3 server ready\r\n").unwrap(),
            Reply::Ok("POP3 server ready".into())
        );
        assert_eq!(
            Reply::parse("-ERR [AUTH] invalid password").unwrap(),
            Reply::Err("[AUTH] invalid password".into())
        );
        assert_eq!(Reply::parse("+ok").unwrap(), Reply::Ok(String::new()));
        assert!(Reply::parse("* OK imap").is_err());
        assert!(Reply::parse("").is_err());
    }

    #[test]
    fn parse_stat() {
        assert_eq!(
            StatResult::parse("2 320").unwrap(),
            StatResult { count: 2, size: 320 }
        );
        assert_eq!(
            StatResult::parse("0 0 extra").unwrap(),
            StatResult::default()
        );
        assert!(StatResult::parse("2").is_err());
        assert!(StatResult::parse("two 320").is_err());
    }

    proptest! {
        #[test]
        fn parse_never_panics(line in "\\PC*") {
            let _ = Reply::parse(&line);
        }

        #[test]
        fn stat_reads_back_any_counts(count in any::<u32>(), size in any::<u64>()) {
            let parsed = StatResult::parse(&format!("{count} {size}")).unwrap();
            prop_assert_eq!(parsed, StatResult { count, size });
        }
    }
}
