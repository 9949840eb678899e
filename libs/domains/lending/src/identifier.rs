//! The 12-digit catalog identifier carried by every item.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("Identifier cannot be empty")]
    Empty,

    #[error("Invalid identifier: expected 12 digits, got {0}")]
    TooShort(usize),

    #[error("Invalid identifier: expected 12 digits, got {0}")]
    TooLong(usize),

    #[error("Invalid identifier: must be 12 digits and numeric only")]
    NonNumeric,
}

/// A normalized catalog identifier: exactly 12 ASCII digits.
///
/// Parsing strips `-` separators and whitespace, so `"1234-5678-9012"` and
/// `" 123456789012 "` both yield `123456789012`. A value of this type is
/// always well-formed; deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "978030640615")]
pub struct Identifier(String);

impl Identifier {
    pub const LENGTH: usize = 12;

    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let normalized: String = raw
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect();

        let len = normalized.chars().count();
        if len == 0 {
            return Err(IdentifierError::Empty);
        }
        if len < Self::LENGTH {
            return Err(IdentifierError::TooShort(len));
        }
        if len > Self::LENGTH {
            return Err(IdentifierError::TooLong(len));
        }
        if !normalized.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentifierError::NonNumeric);
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}
