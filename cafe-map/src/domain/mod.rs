//! Domain types for the cafe aggregator.
//!
//! These types represent validated, merged cafe data. All types enforce
//! their invariants at construction time, so code that receives them
//! (statistics, presentation) can trust their validity.

mod place_id;
mod rating;
mod record;
mod tier;

pub use place_id::{InvalidPlaceId, PlaceId};
pub use rating::{InvalidRating, Rating};
pub use record::{CafeRecord, Coordinates};
pub use tier::{InvalidTier, Tier};
