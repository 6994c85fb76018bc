//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::{info, warn};

use crate::pipeline::{Cancellation, select_entries};
use crate::place::PlaceTransport;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router<T: PlaceTransport + 'static>(state: AppState<T>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cities", get(list_cities::<T>))
        .route("/region/:city", get(region::<T>))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Cities available in the catalog.
async fn list_cities<T: PlaceTransport + 'static>(
    State(state): State<AppState<T>>,
) -> Json<CitiesResponse> {
    Json(CitiesResponse {
        cities: state.catalog.cities(),
    })
}

/// Ingest a city's cafes and summarize them.
///
/// Entries that fail are listed under `skipped`; the summary covers the
/// rest.
async fn region<T: PlaceTransport + 'static>(
    State(state): State<AppState<T>>,
    Path(city): Path<String>,
) -> Result<Json<RegionReport>, AppError> {
    let city = city.trim().to_ascii_lowercase();
    if city.is_empty() {
        return Err(AppError::BadRequest {
            message: "city must not be empty".to_string(),
        });
    }

    if state.catalog.filter_city(&city).next().is_none() {
        return Err(AppError::NotFound {
            message: format!("no cafes in the catalog for {city}"),
        });
    }

    let limit_to = state.limit_to.as_deref();
    let entries = state.catalog.entries();
    let expected = select_entries(&city, entries, limit_to).count();

    let cancel = Cancellation::after(state.request_timeout);
    let report = state.pipeline.run(&city, entries, limit_to, &cancel).await;

    info!(
        city = %city,
        records = report.records.len(),
        skipped = report.failures.len(),
        "region ingested"
    );

    Ok(Json(RegionReport::new(&city, report, expected)))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        warn!(%status, %message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::*;
    use crate::cache::MemoryResultCache;
    use crate::catalog::Catalog;
    use crate::pipeline::{IngestOptions, IngestionPipeline};
    use crate::place::mock::StubTransport;
    use crate::place::{ApiError, PlaceApiClient, PlaceApiConfig};

    const CATALOG: &str = r#"{
        "陶匠咖啡(){c01": { "city": "hsinchu", "wifi": 4, "seat": 5, "quiet": 3, "cheap": 3 },
        "過日子咖啡館 {c03": { "city": "hsinchu", "wifi": 3, "seat": 4, "quiet": 4, "cheap": 2 },
        "Louisa{c02": { "city": "taipei", "wifi": 5, "seat": 3, "quiet": 2, "cheap": 4 }
    }"#;

    fn state(limit_to: Option<BTreeSet<String>>) -> AppState<StubTransport> {
        let body = serde_json::json!({
            "status": "OK",
            "results": [{ "place_id": "abc123", "name": "陶匠咖啡", "rating": 4.2 }]
        })
        .to_string();
        let stub = StubTransport::new()
            .with_body("陶匠咖啡", body)
            .with_failure("過日子咖啡館", ApiError::invalid_response("HTTP 500"));
        let client = PlaceApiClient::with_transport(
            stub,
            &PlaceApiConfig::new("k"),
            Arc::new(MemoryResultCache::new()),
        );
        let pipeline = IngestionPipeline::new(Arc::new(client), IngestOptions::default());
        AppState::new(pipeline, Catalog::from_json(CATALOG).unwrap(), limit_to)
    }

    #[tokio::test]
    async fn region_reports_summary_and_skipped() {
        let Json(report) = region(State(state(None)), Path("HsinChu".to_string()))
            .await
            .unwrap();

        assert_eq!(report.summary.city, "hsinchu");
        assert_eq!(report.summary.count, 1);
        assert_eq!(report.records[0].place_id.as_str(), "abc123");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].query_term, "過日子咖啡館");
        assert!(!report.truncated);
    }

    #[tokio::test]
    async fn region_with_allow_list_is_not_truncated() {
        let allow: BTreeSet<String> = ["陶匠咖啡".to_string()].into();
        let Json(report) = region(State(state(Some(allow))), Path("hsinchu".to_string()))
            .await
            .unwrap();

        assert_eq!(report.records.len(), 1);
        assert!(report.skipped.is_empty());
        assert!(!report.truncated);
    }

    #[tokio::test]
    async fn unknown_city_is_not_found() {
        let err = region(State(state(None)), Path("tainan".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn cities_lists_catalog_cities() {
        let Json(response) = list_cities(State(state(None))).await;
        assert_eq!(response.cities, vec!["hsinchu", "taipei"]);
    }
}
