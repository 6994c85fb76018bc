//! Place-search API response DTOs.
//!
//! These types map directly to the text-search JSON response. Fields are
//! optional because the API omits rather than nulls them.

use serde::{Deserialize, Serialize};

/// Status values that indicate a successful search.
pub const STATUS_OK: &str = "OK";
pub const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";
pub const STATUS_OVER_QUERY_LIMIT: &str = "OVER_QUERY_LIMIT";

/// Response from the text-search endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TextSearchResponse {
    /// `OK`, `ZERO_RESULTS`, or an error status such as `REQUEST_DENIED`.
    pub status: String,

    #[serde(default)]
    pub results: Vec<PlaceResult>,

    /// Human-readable explanation accompanying an error status.
    pub error_message: Option<String>,
}

/// One place from a search response.
///
/// An empty (default) `PlaceResult` stands for "no match".
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlaceResult {
    pub place_id: Option<String>,

    /// Display name as the place-search service knows it.
    pub name: Option<String>,

    /// Average user rating. Not validated here.
    pub rating: Option<f64>,

    /// 0 (free) to 4 (very expensive).
    pub price_level: Option<u8>,

    pub geometry: Option<Geometry>,

    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}
