//! Star-level categorical domain for catalog attributes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a value is not a member of the tier domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a tier (expected a whole number 0-5): {0}")]
pub struct InvalidTier(pub String);

/// A catalog attribute level on the 0–5 star scale.
///
/// Used for wifi quality, seat availability and price (cheapness).
/// Only whole star values are members of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
}

impl Tier {
    /// Every member of the domain, in ascending order.
    pub const ALL: [Tier; 6] = [
        Tier::Zero,
        Tier::One,
        Tier::Two,
        Tier::Three,
        Tier::Four,
        Tier::Five,
    ];

    /// Look up a tier by its star level.
    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(usize::from(level)).copied()
    }

    /// Convert a numeric score. The score must be a whole number in `0..=5`;
    /// fractional scores are not members of the domain.
    pub fn from_score(score: f64) -> Result<Self, InvalidTier> {
        if score.fract() != 0.0 || !(0.0..=5.0).contains(&score) {
            return Err(InvalidTier(score.to_string()));
        }
        // Range checked above.
        Self::from_level(score as u8).ok_or_else(|| InvalidTier(score.to_string()))
    }

    /// Parse a tier from text such as `"4"` or `"4.0"`.
    pub fn parse(s: &str) -> Result<Self, InvalidTier> {
        let score: f64 = s
            .trim()
            .parse()
            .map_err(|_| InvalidTier(s.to_string()))?;
        Self::from_score(score).map_err(|_| InvalidTier(s.to_string()))
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Tier {
    type Error = InvalidTier;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::from_level(level).ok_or_else(|| InvalidTier(level.to_string()))
    }
}

impl From<Tier> for u8 {
    fn from(t: Tier) -> Self {
        t.level()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}
