//! Place-search API client.
//!
//! Resolves a free-text store name to a place with an identifier, rating
//! and location. Every call is billed, so the client is cache-first:
//! raw responses are stored in a [`crate::cache::ResultCache`] keyed by
//! query term, and a term that has been answered is not sent again.

mod client;
mod error;
pub mod mock;
mod transport;
mod types;

pub use client::{PlaceApiClient, PlaceApiConfig, parse_payload};
pub use error::{ApiError, ApiErrorKind};
pub use transport::{HttpTransport, PlaceTransport};
pub use types::{Geometry, LatLng, PlaceResult, TextSearchResponse};
