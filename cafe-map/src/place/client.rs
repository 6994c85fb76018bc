//! Place-search API client.
//!
//! Wraps a [`PlaceTransport`] with the result cache, a per-term lock, an
//! in-flight ceiling and an optional call budget. Each call costs money:
//! within one client, a query term that was answered once is never sent
//! again unless explicitly refreshed.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, Semaphore};
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::config::AppConfig;

use super::error::ApiError;
use super::transport::{HttpTransport, PlaceTransport};
use super::types::{
    PlaceResult, STATUS_OK, STATUS_OVER_QUERY_LIMIT, STATUS_ZERO_RESULTS, TextSearchResponse,
};

/// Default base URL for the place-search API.
const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Default language hint.
const DEFAULT_LANGUAGE: &str = "zh-TW";

/// Default maximum concurrent requests. One keeps runs strictly sequential.
const DEFAULT_MAX_CONCURRENT: usize = 1;

/// Configuration for the place-search client.
#[derive(Clone)]
pub struct PlaceApiConfig {
    /// API key; sent as a query parameter, never logged
    pub api_key: String,
    /// Base URL for the API (defaults to production)
    pub base_url: String,
    /// Language hint for result names
    pub language: String,
    /// Maximum requests in flight at once
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of paid calls this client may make
    pub call_budget: Option<usize>,
}

impl PlaceApiConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
            call_budget: None,
        }
    }

    /// Build from the process configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            language: config.language.clone(),
            max_concurrent: config.max_concurrent,
            call_budget: config.call_budget,
            ..Self::new(config.api_key.clone())
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Cap the number of paid calls.
    pub fn with_call_budget(mut self, budget: usize) -> Self {
        self.call_budget = Some(budget);
        self
    }
}

impl fmt::Debug for PlaceApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceApiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("max_concurrent", &self.max_concurrent)
            .field("timeout_secs", &self.timeout_secs)
            .field("call_budget", &self.call_budget)
            .finish()
    }
}

/// Cache-first place-search client.
pub struct PlaceApiClient<T = HttpTransport> {
    transport: T,
    cache: Arc<dyn ResultCache>,
    semaphore: Semaphore,
    /// One lock per query term, so check-fetch-put is atomic per key.
    /// Entries live only while some task holds or waits on them.
    term_locks: TermLocks,
    calls_made: AtomicUsize,
    call_budget: Option<usize>,
}

impl PlaceApiClient<HttpTransport> {
    /// Create a client that talks to the real API.
    pub fn new(config: &PlaceApiConfig, cache: Arc<dyn ResultCache>) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(
            &config.base_url,
            &config.api_key,
            &config.language,
            config.timeout_secs,
        )?;
        Ok(Self::with_transport(transport, config, cache))
    }
}

impl<T: PlaceTransport> PlaceApiClient<T> {
    /// Create a client over any transport.
    pub fn with_transport(
        transport: T,
        config: &PlaceApiConfig,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        Self {
            transport,
            cache,
            semaphore: Semaphore::new(config.max_concurrent.max(1)),
            term_locks: TermLocks::default(),
            calls_made: AtomicUsize::new(0),
            call_budget: config.call_budget,
        }
    }

    /// Search for `query_term`, answering from the cache when possible.
    ///
    /// On a miss, makes exactly one call. A successful response (including
    /// `ZERO_RESULTS`) is cached before the parsed result is returned;
    /// failures are not cached and are not retried.
    ///
    /// `ZERO_RESULTS` yields an empty [`PlaceResult`].
    pub async fn search(&self, query_term: &str) -> Result<PlaceResult, ApiError> {
        let _lease = self.term_locks.acquire(query_term).await;

        if let Some(entry) = self.cache.get(query_term) {
            debug!(query = %query_term, "place cache hit");
            return parse_payload(&entry.payload);
        }

        debug!(query = %query_term, "place cache miss");
        self.fetch_and_store(query_term).await
    }

    /// Fetch `query_term` from the API even if it is cached, overwriting
    /// the cached response on success.
    pub async fn refresh(&self, query_term: &str) -> Result<PlaceResult, ApiError> {
        let _lease = self.term_locks.acquire(query_term).await;
        self.fetch_and_store(query_term).await
    }

    /// Number of calls handed to the transport so far.
    pub fn calls_made(&self) -> usize {
        self.calls_made.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> &Arc<dyn ResultCache> {
        &self.cache
    }

    fn reserve_call(&self) -> Result<(), ApiError> {
        match self.call_budget {
            Some(budget) => self
                .calls_made
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n < budget).then_some(n + 1)
                })
                .map(|_| ())
                .map_err(|_| ApiError::budget_exhausted(format!("limit is {budget} calls"))),
            None => {
                self.calls_made.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn fetch_and_store(&self, query_term: &str) -> Result<PlaceResult, ApiError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ApiError::network("semaphore closed"))?;

        self.reserve_call()?;

        let body = self.transport.text_search(query_term).await?;
        let payload: Value = serde_json::from_str(&body).map_err(|e| {
            ApiError::invalid_response(format!(
                "{e} (body: {})",
                body.chars().take(200).collect::<String>()
            ))
        })?;

        let result = parse_payload(&payload)?;

        if let Err(e) = self.cache.put(query_term, payload) {
            warn!(query = %query_term, error = %e, "failed to persist place response");
        }

        Ok(result)
    }
}

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Per-term async locks, created on demand.
#[derive(Default)]
struct TermLocks {
    locks: Mutex<LockMap>,
}

impl TermLocks {
    async fn acquire(&self, term: &str) -> TermLease<'_> {
        let lock = {
            let mut locks = self.map();
            Arc::clone(
                locks
                    .entry(term.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        TermLease {
            locks: self,
            term: term.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn len(&self) -> usize {
        self.map().len()
    }
}

/// Holds one term's lock; drops the map entry when nobody else needs it.
struct TermLease<'a> {
    locks: &'a TermLocks,
    term: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TermLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.map();
        // Clones are only made under the map lock, so a count of one
        // means no task holds or waits on this entry.
        if locks
            .get(&self.term)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.term);
        }
    }
}

/// Interpret a raw text-search document.
///
/// Takes the first result of an `OK` response; `ZERO_RESULTS` gives an
/// empty result. Any other `status` is an error.
pub fn parse_payload(payload: &Value) -> Result<PlaceResult, ApiError> {
    let response = TextSearchResponse::deserialize(payload)
        .map_err(|e| ApiError::invalid_response(e.to_string()))?;

    match response.status.as_str() {
        STATUS_OK => Ok(response.results.into_iter().next().unwrap_or_default()),
        STATUS_ZERO_RESULTS => Ok(PlaceResult::default()),
        STATUS_OVER_QUERY_LIMIT => Err(ApiError::rate_limited(
            response
                .error_message
                .unwrap_or_else(|| STATUS_OVER_QUERY_LIMIT.to_string()),
        )),
        other => Err(ApiError::invalid_response(match response.error_message {
            Some(message) => format!("status {other}: {message}"),
            None => format!("status {other}"),
        })),
    }
}
