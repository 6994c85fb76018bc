//! Web layer for the cafe aggregator.
//!
//! A thin JSON surface over the ingestion pipeline and statistics engine.
//! Each region request re-runs ingestion (answered from the result cache
//! where possible) and recomputes the summary.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;
