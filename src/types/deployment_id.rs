// ABOUTME: DNS-compatible deployment slot identifier.
// ABOUTME: Ensures ids are safe as a path component and as an RFC 1123 host label.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeploymentIdError {
    #[error("deployment id cannot be empty")]
    Empty,

    #[error("deployment id exceeds maximum length of 63 characters")]
    TooLong,

    #[error("deployment id cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("deployment id cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("deployment id must be lowercase")]
    NotLowercase,

    #[error("invalid character in deployment id: '{0}'")]
    InvalidChar(char),
}

/// Name of a deployment slot.
///
/// The id becomes the hostname label `{id}.{domain}` and the upstream dial
/// address `{id}:{port}`, so it follows the same rules as a DNS label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeploymentId(String);

impl DeploymentId {
    pub fn new(value: &str) -> Result<Self, DeploymentIdError> {
        if value.is_empty() {
            return Err(DeploymentIdError::Empty);
        }

        if value.len() > 63 {
            return Err(DeploymentIdError::TooLong);
        }

        if value.starts_with('-') {
            return Err(DeploymentIdError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(DeploymentIdError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(DeploymentIdError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(DeploymentIdError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeploymentId {
    type Err = DeploymentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
