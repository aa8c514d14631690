//! Command tags.
//!
//! A client owns exactly one generator, so tags are handed out through
//! `&mut self` and need no synchronization.

/// Hands out `A0000`, `A0001`, ... for one session.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    prefix: char,
    issued: u32,
}

impl TagGenerator {
    /// Creates a generator whose tags start with `prefix`.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { prefix, issued: 0 }
    }

    /// Returns a fresh tag. Wraps to zero after `u32::MAX`.
    pub fn next_tag(&mut self) -> String {
        let tag = format!("{}{:04}", self.prefix, self.issued);
        self.issued = self.issued.wrapping_add(1);
        tag
    }

    /// Number of tags issued so far.
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.issued
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
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
    fn test_sequential_tags() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next_tag(), "A0000");
        assert_eq!(tags.next_tag(), "A0001");
        assert_eq!(tags.issued(), 2);
    }

    #[test]
    fn test_prefix_and_width() {
        let mut tags = TagGenerator::new('P');
        let last = (0..=100).map(|_| tags.next_tag()).last().unwrap();
        assert_eq!(last, "P0100");
        tags.issued = 12345;
        assert_eq!(tags.next_tag(), "P12345");
    }

    #[test]
    fn test_counter_wraps() {
        let mut tags = TagGenerator { prefix: 'A', issued: u32::MAX };
        assert_eq!(tags.next_tag(), format!("A{}", u32::MAX));
        assert_eq!(tags.next_tag(), "A0000");
    }
}
