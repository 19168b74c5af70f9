//! Session identifier type.

use std::fmt;
use std::str::FromStr;

use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Number of hex characters in a rendered identifier (128 bits).
const ID_LEN: usize = 32;

/// Unique identifier for a client session.
///
/// Identifiers carry 128 bits from the operating system's CSPRNG and are
/// rendered as 32 lowercase hexadecimal characters. Parsing accepts only that
/// exact shape, so an identifier is always safe to use as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier.
    ///
    /// # Panics
    ///
    /// Panics if the OS entropy source is unavailable.
    pub fn generate() -> Self {
        let value: u128 = OsRng.gen();
        Self(format!("{:032x}", value))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_well_formed(s: &str) -> bool {
        s.len() == ID_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_well_formed(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(SessionError::InvalidSessionId(s.into()))
        }
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_well_formed(&value) {
            Ok(Self(value))
        } else {
            Err(SessionError::InvalidSessionId(value))
        }
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..10_000 {
            let id = SessionId::generate();
            assert!(ids.insert(id.clone()), "Duplicate ID generated: {}", id);
        }
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_generated_shape() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id.as_str(), id.as_str().to_lowercase());
    }

    #[test]
    fn test_parse_valid() {
        let id: SessionId = "0123456789abcdef0123456789abcdef".parse().unwrap();
        assert_eq!(id.to_string(), "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn test_parse_invalid() {
        // Too short
        assert!("abc123".parse::<SessionId>().is_err());

        // Uppercase hex
        assert!("0123456789ABCDEF0123456789ABCDEF".parse::<SessionId>().is_err());

        // Path traversal
        assert!("../../../../etc/passwd0000000000".parse::<SessionId>().is_err());

        // Empty
        assert!("".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_serde_rejects_malformed() {
        let ok: SessionId =
            serde_json::from_str("\"ffffffffffffffffffffffffffffffff\"").unwrap();
        assert_eq!(ok.as_str(), "ffffffffffffffffffffffffffffffff");

        let bad = serde_json::from_str::<SessionId>("\"not-an-id\"");
        assert!(bad.is_err());
    }
}
