//! Place rating type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a rating lies outside `[0.0, 5.0]`.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("rating {0} is outside 0.0..=5.0")]
pub struct InvalidRating(pub f64);

/// A place rating in `[0.0, 5.0]`.
///
/// NaN and infinities are rejected, so `Rating` is always finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(f64);

impl Rating {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 5.0;

    /// Validate a raw rating value.
    pub fn new(value: f64) -> Result<Self, InvalidRating> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidRating(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Rating {
    type Error = InvalidRating;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(r: Rating) -> Self {
        r.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}
