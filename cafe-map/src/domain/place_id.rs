//! Place identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a place identifier is empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("place id must not be empty")]
pub struct InvalidPlaceId;

/// A stable, non-empty identifier from the place-search API.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaceId(String);

impl PlaceId {
    /// Parse a place id. Surrounding whitespace is trimmed; the remainder
    /// must be non-empty.
    pub fn parse(s: &str) -> Result<Self, InvalidPlaceId> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidPlaceId);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlaceId {
    type Error = InvalidPlaceId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PlaceId> for String {
    fn from(id: PlaceId) -> Self {
        id.0
    }
}

impl fmt::Debug for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaceId({})", self.0)
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
