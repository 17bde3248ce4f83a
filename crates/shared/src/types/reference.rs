//! Validated idempotency key supplied by callers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when an external reference fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// Blank after trimming.
    #[error("External reference cannot be empty")]
    Empty,

    /// Longer than the storage column allows.
    #[error("External reference is {length} characters, maximum is {max}")]
    TooLong {
        /// Length after trimming.
        length: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// Contains a character outside `[A-Za-z0-9_-]`.
    #[error("External reference contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Idempotency key of an operation.
///
/// The canonical form is the trimmed input; equality and hashing use it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalReference(String);

impl ExternalReference {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 255;

    /// Validates and canonicalizes a reference.
    pub fn parse(value: &str) -> Result<Self, ReferenceError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let length = trimmed.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(ReferenceError::TooLong {
                length,
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(ReferenceError::InvalidCharacter(bad));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Returns the canonical value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ExternalReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExternalReference {
    type Error = ReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExternalReference> for String {
    fn from(reference: ExternalReference) -> Self {
        reference.0
    }
}

impl AsRef<str> for ExternalReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
