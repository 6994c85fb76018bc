//! The merged cafe record.

use serde::{Deserialize, Serialize};

use super::{PlaceId, Rating, Tier};

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A validated cafe: one catalog entry merged with its place-search match.
///
/// Every field is already validated by its type (`PlaceId` is non-empty,
/// `Rating` is in range, tiers are members of their domain), so a
/// `CafeRecord` can only be built from valid parts. Records are values:
/// changing an attribute means building a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CafeRecord {
    /// Place-search identifier.
    pub place_id: PlaceId,

    /// Normalized store name (the query term).
    pub name: String,

    /// Catalog city key, e.g. `"hsinchu"`.
    pub city: String,

    /// Place-search rating, if the place has one.
    pub rating: Option<Rating>,

    pub wifi_tier: Tier,
    pub seat_availability: Tier,
    pub price_tier: Tier,

    /// Catalog quietness score in `[0.0, 5.0]`, if recorded.
    pub quietness_score: Option<f64>,

    pub coordinates: Option<Coordinates>,
}

impl CafeRecord {
    /// Rating as a plain number, for aggregation.
    pub fn rating_value(&self) -> Option<f64> {
        self.rating.map(Rating::value)
    }
}
