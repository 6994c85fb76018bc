//! Ingestion: catalog entries in, cafe records out.
//!
//! For one city, each surviving catalog entry goes through
//! normalize → place search (cache first) → map. Every entry yields its
//! own `Result`, so a failed lookup never hides the entries that worked.
//!
//! The output is a lazy stream in catalog order. Entries are dispatched
//! one at a time by default; with `concurrency > 1` up to that many are
//! in flight, while the client's semaphore still bounds actual calls.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::catalog::CatalogEntry;
use crate::domain::CafeRecord;
use crate::mapper::{MappingError, map_record};
use crate::normalize::normalize;
use crate::place::{ApiError, HttpTransport, PlaceApiClient, PlaceResult, PlaceTransport};

#[cfg(test)]
mod ingest_tests;

/// Why one entry produced no record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestFailure {
    /// The store name is empty once cleaned; nothing to search for
    #[error("store name is empty after normalization")]
    EmptyName,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// A failed entry, with enough context to show the user what was skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{store_key}: {reason}")]
pub struct IngestError {
    pub store_key: String,
    pub query_term: String,
    pub reason: IngestFailure,
}

/// Outcome for one catalog entry.
pub type IngestOutcome = Result<CafeRecord, IngestError>;

/// How the orchestrator retries transient place-search failures.
///
/// Only `Network` and `RateLimited` errors are retried. Delays double
/// after each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 means no retry.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_attempts: 1,
        base_delay: Duration::ZERO,
    };

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before attempt `attempt + 1`, given `attempt` (1-based) failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}

/// Stop signal for a run: explicit, by deadline, or both.
///
/// Checked before each entry is dispatched and before each retry. A call
/// already in flight is allowed to finish and its outcome is still
/// yielded.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel automatically at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cancel automatically once `timeout` has elapsed from now.
    pub fn after(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Sleep for `delay`, waking early at the deadline.
    pub async fn sleep(&self, delay: Duration) {
        let wake = Instant::now() + delay;
        tokio::time::sleep_until(self.deadline.map_or(wake, |d| d.min(wake))).await;
    }
}

/// Tuning for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Entries processed at once. 1 is strictly sequential.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            retry: RetryPolicy::NONE,
        }
    }
}

/// Orchestrates normalize → search → map over catalog entries.
pub struct IngestionPipeline<T = HttpTransport> {
    client: Arc<PlaceApiClient<T>>,
    options: IngestOptions,
}

impl<T: PlaceTransport> IngestionPipeline<T> {
    pub fn new(client: Arc<PlaceApiClient<T>>, options: IngestOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &Arc<PlaceApiClient<T>> {
        &self.client
    }

    /// Ingest the entries of `city_filter`.
    ///
    /// When `limit_to` is given, only entries whose normalized name is in
    /// the allow-list are processed. The stream is single-pass: calling
    /// `ingest` again re-runs every lookup (answered from the cache where
    /// possible).
    pub fn ingest<'a>(
        &'a self,
        city_filter: &'a str,
        entries: &'a [CatalogEntry],
        limit_to: Option<&'a BTreeSet<String>>,
        cancel: &Cancellation,
    ) -> impl Stream<Item = IngestOutcome> + 'a {
        let dispatch = cancel.clone();
        let cancel = cancel.clone();

        stream::iter(select_entries(city_filter, entries, limit_to))
            .take_while(move |_| futures::future::ready(!dispatch.is_cancelled()))
            .map(move |entry| self.ingest_entry(entry, cancel.clone()))
            .buffered(self.options.concurrency.max(1))
    }

    /// Ingest and gather everything into a report.
    pub async fn run(
        &self,
        city_filter: &str,
        entries: &[CatalogEntry],
        limit_to: Option<&BTreeSet<String>>,
        cancel: &Cancellation,
    ) -> IngestReport {
        IngestReport::collect(self.ingest(city_filter, entries, limit_to, cancel)).await
    }

    async fn ingest_entry(&self, entry: &CatalogEntry, cancel: Cancellation) -> IngestOutcome {
        let query_term = normalize(&entry.name);

        let outcome = if query_term.is_empty() {
            Err(IngestFailure::EmptyName)
        } else {
            match self.search_with_retry(&query_term, &cancel).await {
                Ok(place) => map_record(entry, &place).map_err(IngestFailure::from),
                Err(e) => Err(IngestFailure::from(e)),
            }
        };

        match outcome {
            Ok(record) => {
                debug!(store = %entry.store_key, place_id = %record.place_id, "ingested");
                Ok(record)
            }
            Err(reason) => {
                warn!(store = %entry.store_key, query = %query_term, error = %reason, "skipping entry");
                Err(IngestError {
                    store_key: entry.store_key.clone(),
                    query_term,
                    reason,
                })
            }
        }
    }

    /// Search, retrying transient failures until the policy or `cancel`
    /// says stop. Once cancelled, the last error is returned.
    async fn search_with_retry(
        &self,
        query_term: &str,
        cancel: &Cancellation,
    ) -> Result<PlaceResult, ApiError> {
        let policy = self.options.retry;
        let mut attempt = 1;
        loop {
            match self.client.search(query_term).await {
                Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                    let delay = policy.delay_after(attempt);
                    if !cancel.is_cancelled() {
                        cancel.sleep(delay).await;
                    }
                    if cancel.is_cancelled() {
                        debug!(query = %query_term, attempt, error = %e, "cancelled, not retrying");
                        return Err(e);
                    }
                    debug!(query = %query_term, attempt, ?delay, error = %e, "retrying");
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

/// The entries a run over `city_filter` would process, in catalog order.
pub fn select_entries<'a>(
    city_filter: &'a str,
    entries: &'a [CatalogEntry],
    limit_to: Option<&'a BTreeSet<String>>,
) -> impl Iterator<Item = &'a CatalogEntry> {
    entries
        .iter()
        .filter(move |e| e.in_city(city_filter))
        .filter(move |e| limit_to.is_none_or(|allow| is_allowed(allow, &e.name)))
}

fn is_allowed(allow: &BTreeSet<String>, raw_name: &str) -> bool {
    let term = normalize(raw_name);
    allow.contains(&term) || allow.iter().any(|a| normalize(a) == term)
}

/// Successes and failures of one run, in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub records: Vec<CafeRecord>,
    pub failures: Vec<IngestError>,
}

impl IngestReport {
    /// Drain an ingest stream.
    pub async fn collect(outcomes: impl Stream<Item = IngestOutcome>) -> Self {
        let mut report = Self::default();
        let mut outcomes = std::pin::pin!(outcomes);
        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Ok(record) => report.records.push(record),
                Err(e) => report.failures.push(e),
            }
        }
        report
    }

    /// Entries that were dispatched.
    pub fn attempted(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delays_double() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn retry_attempts_are_at_least_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::default(), RetryPolicy::NONE);
    }

    #[test]
    fn cancellation_flags() {
        let cancel = Cancellation::new();
        assert!(!cancel.is_cancelled());
        let shared = cancel.clone();
        shared.cancel();
        assert!(cancel.is_cancelled());

        assert!(Cancellation::after(Duration::ZERO).is_cancelled());
        assert!(!Cancellation::after(Duration::from_secs(3600)).is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_sleep_wakes_at_deadline() {
        let cancel = Cancellation::after(Duration::from_millis(10));
        let started = Instant::now();
        cancel.sleep(Duration::from_secs(3600)).await;
        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn allow_list_matches_normalized_names() {
        let allow: BTreeSet<String> = ["陶匠咖啡".to_string(), "過日子咖啡館 ".to_string()].into();
        assert!(is_allowed(&allow, "陶匠咖啡()"));
        assert!(is_allowed(&allow, "過日子咖啡館"));
        assert!(!is_allowed(&allow, "Louisa"));
    }
}
