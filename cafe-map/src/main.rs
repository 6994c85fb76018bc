use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cafe_map::cache::{CacheError, FileResultCache, ResultCache};
use cafe_map::catalog::{Catalog, CatalogError};
use cafe_map::config::{AppConfig, ConfigError};
use cafe_map::pipeline::{IngestOptions, IngestionPipeline, RetryPolicy};
use cafe_map::place::{ApiError, PlaceApiClient, PlaceApiConfig};
use cafe_map::web::{AppState, create_router};

/// Base delay between retries of a transient place-search failure.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Failures that stop the server from starting.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("result cache: {0}")]
    Cache(#[from] CacheError),

    #[error("place client: {0}")]
    Client(#[from] ApiError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "startup failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    info!(?config, "starting cafe map");

    let catalog = Catalog::load(&config.catalog_path)?;
    info!(entries = catalog.len(), cities = catalog.cities().len(), "loaded catalog");

    let cache = Arc::new(FileResultCache::load(&config.cache_path)?);
    info!(path = %cache.path().display(), entries = cache.len(), "loaded result cache");

    let client = PlaceApiClient::new(
        &PlaceApiConfig::from_app_config(&config),
        Arc::clone(&cache) as Arc<dyn ResultCache>,
    )?;

    let options = IngestOptions {
        concurrency: config.max_concurrent,
        retry: RetryPolicy::new(config.retry_attempts, RETRY_BASE_DELAY),
    };
    let pipeline = IngestionPipeline::new(Arc::new(client), options);

    if let Some(limit_to) = &config.limit_to {
        info!(stores = limit_to.len(), "limited mode: only allow-listed stores are looked up");
    }

    let state = AppState::new(pipeline, catalog, config.limit_to.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Flush even if serving failed.
    if let Err(e) = cache.flush() {
        error!(error = %e, "failed to flush result cache");
    }
    info!("shut down");

    Ok(served?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
