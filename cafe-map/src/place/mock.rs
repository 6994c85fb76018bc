//! Stub transport for testing without API access.
//!
//! Serves canned bodies and failures per query term and counts every
//! call, so tests can assert how many paid requests a run would make.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::error::ApiError;
use super::transport::PlaceTransport;

#[derive(Default)]
struct StubState {
    responses: HashMap<String, Result<String, ApiError>>,
    calls: HashMap<String, usize>,
}

/// Transport that answers from a fixed table.
///
/// Cloning shares the table and counters.
#[derive(Clone, Default)]
pub struct StubTransport {
    state: Arc<Mutex<StubState>>,
    delay: Option<Duration>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with `body`.
    pub fn with_body(self, query: &str, body: impl Into<String>) -> Self {
        self.lock()
            .responses
            .insert(query.to_string(), Ok(body.into()));
        self
    }

    /// Fail `query` with `error`.
    pub fn with_failure(self, query: &str, error: ApiError) -> Self {
        self.lock().responses.insert(query.to_string(), Err(error));
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls made for `query`.
    pub fn calls_for(&self, query: &str) -> usize {
        self.lock().calls.get(query).copied().unwrap_or(0)
    }

    /// Calls made across all queries.
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PlaceTransport for StubTransport {
    async fn text_search(&self, query: &str) -> Result<String, ApiError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        *state.calls.entry(query.to_string()).or_default() += 1;
        state.responses.get(query).cloned().unwrap_or_else(|| {
            Err(ApiError::invalid_response(format!(
                "HTTP 404: no stub response for {query}"
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_table_and_counts() {
        let stub = StubTransport::new()
            .with_body("a", "{}")
            .with_failure("b", ApiError::network("down"));

        assert_eq!(stub.text_search("a").await.unwrap(), "{}");
        assert!(stub.text_search("b").await.is_err());
        assert!(stub.text_search("c").await.is_err());

        assert_eq!(stub.calls_for("a"), 1);
        assert_eq!(stub.total_calls(), 3);
    }
}
