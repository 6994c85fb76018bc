//! Merging a catalog entry with its place-search result.
//!
//! [`map_record`] validates both inputs and produces a [`CafeRecord`], or
//! a [`MappingError`] naming the first problem found. Mapping is pure:
//! the same inputs always give the same outcome.

use serde_json::Value;

use crate::catalog::CatalogEntry;
use crate::domain::{CafeRecord, Coordinates, PlaceId, Rating, Tier};
use crate::normalize::normalize;
use crate::place::PlaceResult;

/// Fraction of query-term characters that must appear in the result name
/// for the two to be considered the same store.
const MIN_SHARED_CHARS: f64 = 0.5;

/// Words that say "cafe" rather than which cafe. Longest first.
const GENERIC_WORDS: &[&str] = &[
    "咖啡館", "咖啡馆", "咖啡廳", "咖啡厅", "咖啡店", "咖啡", "coffee", "café", "cafe",
];

/// Validation failure while building a [`CafeRecord`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    /// The place result has no identifier (including "no match")
    #[error("place result has no place_id")]
    MissingPlaceId,

    /// The place rating is outside 0.0..=5.0
    #[error("rating {0} is outside 0.0..=5.0")]
    RatingOutOfRange(f64),

    /// A catalog attribute is not a member of its domain
    #[error("unknown value for {field}: {value}")]
    UnknownCategoricalValue { field: &'static str, value: String },

    /// The place result names a different store than the catalog entry
    #[error("place result {found:?} does not match store {expected:?}")]
    ResultMismatch { expected: String, found: String },
}

/// Build a [`CafeRecord`] from a catalog entry and its place-search match.
///
/// Checks, in order: place id, rating range, that the result names the
/// same store, then each catalog attribute.
pub fn map_record(entry: &CatalogEntry, result: &PlaceResult) -> Result<CafeRecord, MappingError> {
    let place_id = result
        .place_id
        .as_deref()
        .ok_or(MappingError::MissingPlaceId)
        .and_then(|id| PlaceId::parse(id).map_err(|_| MappingError::MissingPlaceId))?;

    let rating = result
        .rating
        .map(|r| Rating::new(r).map_err(|_| MappingError::RatingOutOfRange(r)))
        .transpose()?;

    let name = normalize(&entry.name);

    if let Some(found) = result.name.as_deref()
        && !names_resemble(&name, found)
    {
        return Err(MappingError::ResultMismatch {
            expected: name,
            found: found.to_string(),
        });
    }

    Ok(CafeRecord {
        place_id,
        name,
        // Cities are matched case-insensitively; records carry the folded key.
        city: entry.city.trim().to_ascii_lowercase(),
        rating,
        wifi_tier: tier_field("wifi", entry.wifi.as_ref())?,
        seat_availability: tier_field("seat", entry.seat.as_ref())?,
        price_tier: tier_field("cheap", entry.cheap.as_ref())?,
        quietness_score: score_field("quiet", entry.quiet.as_ref())?,
        coordinates: result.geometry.map(|g| Coordinates {
            lat: g.location.lat,
            lng: g.location.lng,
        }),
    })
}

/// Whether a place-search name plausibly refers to the store queried.
///
/// Both sides are normalized, lowercased and stripped of generic words
/// such as 咖啡 or coffee. They match when either contains the other, or
/// when enough of the query's remaining characters occur in the result
/// name (place-search names often add a branch or an English translation,
/// or drop a word).
pub fn names_resemble(query_term: &str, result_name: &str) -> bool {
    let query = distinctive(query_term);
    let found = distinctive(result_name);

    if query.is_empty() || found.is_empty() {
        return query == found;
    }
    if query.contains(&found) || found.contains(&query) {
        return true;
    }

    let total = query.chars().count();
    let shared = query.chars().filter(|c| found.contains(*c)).count();
    shared as f64 / total as f64 >= MIN_SHARED_CHARS
}

/// The part of a name that identifies the store. A name made only of
/// generic words is kept whole.
fn distinctive(name: &str) -> String {
    let name = normalize(name).to_lowercase();
    let stripped = GENERIC_WORDS
        .iter()
        .fold(name.clone(), |acc, word| acc.replace(word, ""));
    if stripped.is_empty() { name } else { stripped }
}

fn render(value: Option<&Value>) -> String {
    value.map_or_else(|| "null".to_string(), Value::to_string)
}

fn tier_field(field: &'static str, value: Option<&Value>) -> Result<Tier, MappingError> {
    let unknown = || MappingError::UnknownCategoricalValue {
        field,
        value: render(value),
    };

    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(unknown)
            .and_then(|score| Tier::from_score(score).map_err(|_| unknown())),
        Some(Value::String(s)) => Tier::parse(s).map_err(|_| unknown()),
        _ => Err(unknown()),
    }
}

fn score_field(field: &'static str, value: Option<&Value>) -> Result<Option<f64>, MappingError> {
    let unknown = || MappingError::UnknownCategoricalValue {
        field,
        value: render(value),
    };

    let score = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(unknown)?,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| unknown())?,
        Some(_) => return Err(unknown()),
    };

    if (0.0..=5.0).contains(&score) {
        Ok(Some(score))
    } else {
        Err(unknown())
    }
}
