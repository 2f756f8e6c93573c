// ABOUTME: Content fingerprint of an uploaded artifact.
// ABOUTME: A validated lowercase hex SHA-256 digest, safe to use as a directory name.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of hex characters in a SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("fingerprint must be {FINGERPRINT_LEN} characters, got {0}")]
    Length(usize),

    #[error("fingerprint must be lowercase hex, found '{0}'")]
    InvalidChar(char),
}

#[must_use = "fingerprints identify artifacts and should not be ignored"]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a fingerprint, e.g. a checksum read back from the ledger.
    pub fn parse(value: &str) -> Result<Self, FingerprintError> {
        if value.len() != FINGERPRINT_LEN {
            return Err(FingerprintError::Length(value.len()));
        }

        if let Some(c) = value
            .chars()
            .find(|c| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(FingerprintError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    /// Encode raw digest bytes.
    pub fn from_digest(digest: &[u8]) -> Self {
        let hex = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_digest_is_lowercase_hex() {
        let fp = Fingerprint::from_digest(&[0xAB; 32]);
        assert_eq!(fp.as_str(), "ab".repeat(32));
        assert_eq!(fp.short(), "abababababab");
    }

    #[test]
    fn parse_rejects_path_components() {
        let traversal = format!("../{}", "a".repeat(61));
        assert_eq!(
            Fingerprint::parse(&traversal),
            Err(FingerprintError::InvalidChar('.'))
        );
    }

    #[test]
    fn parse_rejects_uppercase() {
        let upper = "A".repeat(64);
        assert_eq!(
            Fingerprint::parse(&upper),
            Err(FingerprintError::InvalidChar('A'))
        );
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(Fingerprint::parse("abc123"), Err(FingerprintError::Length(6)));
    }
}
