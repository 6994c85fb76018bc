//! Response types for the JSON API.

use serde::Serialize;

use crate::domain::CafeRecord;
use crate::pipeline::{IngestError, IngestReport};
use crate::stats::{RegionSummary, summarize};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Cities present in the catalog.
#[derive(Debug, Serialize)]
pub struct CitiesResponse {
    pub cities: Vec<String>,
}

/// An entry that produced no record, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub store_key: String,
    pub query_term: String,
    pub reason: String,
}

impl From<&IngestError> for SkippedEntry {
    fn from(e: &IngestError) -> Self {
        Self {
            store_key: e.store_key.clone(),
            query_term: e.query_term.clone(),
            reason: e.reason.to_string(),
        }
    }
}

/// Everything the presentation layer needs for one region: the summary
/// over the records that succeeded, the records, and what was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionReport {
    pub summary: RegionSummary,
    pub records: Vec<CafeRecord>,
    pub skipped: Vec<SkippedEntry>,
    /// Set when the request ran out of time before every entry was tried.
    pub truncated: bool,
}

impl RegionReport {
    /// Build from an ingest report. `expected` is how many entries were
    /// selected for the run.
    pub fn new(city: &str, report: IngestReport, expected: usize) -> Self {
        Self {
            summary: summarize(city, &report.records),
            skipped: report.failures.iter().map(SkippedEntry::from).collect(),
            truncated: report.attempted() < expected,
            records: report.records,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
