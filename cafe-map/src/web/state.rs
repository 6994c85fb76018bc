//! Application state for the web layer.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::Catalog;
use crate::pipeline::IngestionPipeline;
use crate::place::HttpTransport;

/// Default time budget for ingesting one region per request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared application state.
pub struct AppState<T = HttpTransport> {
    /// Ingestion pipeline over the place-search client
    pub pipeline: Arc<IngestionPipeline<T>>,

    /// Cafe-attribute catalog, loaded at startup
    pub catalog: Arc<Catalog>,

    /// Allow-list for limited runs
    pub limit_to: Option<Arc<BTreeSet<String>>>,

    /// After this long, no further entries are dispatched for a request
    pub request_timeout: Duration,
}

impl<T> AppState<T> {
    /// Create a new app state.
    pub fn new(
        pipeline: IngestionPipeline<T>,
        catalog: Catalog,
        limit_to: Option<BTreeSet<String>>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            catalog: Arc::new(catalog),
            limit_to: limit_to.map(Arc::new),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            catalog: Arc::clone(&self.catalog),
            limit_to: self.limit_to.clone(),
            request_timeout: self.request_timeout,
        }
    }
}
