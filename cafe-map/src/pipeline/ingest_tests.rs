//! End-to-end ingest scenarios over a stub transport.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::{Value, json};

use super::*;
use crate::cache::{MemoryResultCache, ResultCache};
use crate::catalog::CatalogEntry;
use crate::place::mock::StubTransport;
use crate::place::{ApiErrorKind, PlaceApiConfig};
use crate::stats::summarize;

fn entry(key: &str, name: &str, city: &str) -> CatalogEntry {
    CatalogEntry {
        store_key: key.to_string(),
        name: name.to_string(),
        city: city.to_string(),
        wifi: Some(json!(4)),
        seat: Some(json!(3)),
        quiet: Some(json!(4.5)),
        cheap: Some(json!(2)),
        address: None,
    }
}

fn ok_body(place_id: &str, name: &str, rating: f64) -> String {
    json!({
        "status": "OK",
        "results": [{
            "place_id": place_id,
            "name": name,
            "rating": rating,
            "geometry": { "location": { "lat": 24.80, "lng": 120.97 } }
        }]
    })
    .to_string()
}

fn pipeline(stub: StubTransport, options: IngestOptions) -> IngestionPipeline<StubTransport> {
    let config = PlaceApiConfig::new("test-key").with_max_concurrent(options.concurrency);
    let client = PlaceApiClient::with_transport(stub, &config, Arc::new(MemoryResultCache::new()));
    IngestionPipeline::new(Arc::new(client), options)
}

fn hsinchu_catalog() -> Vec<CatalogEntry> {
    vec![
        entry("陶匠咖啡(){c01", "陶匠咖啡()", "hsinchu"),
        entry("Louisa{c02", "Louisa", "taipei"),
        entry("過日子咖啡館 {c03", "過日子咖啡館 ", "hsinchu"),
    ]
}

fn hsinchu_stub() -> StubTransport {
    StubTransport::new()
        .with_body("陶匠咖啡", ok_body("abc123", "陶匠咖啡", 4.2))
        .with_failure("過日子咖啡館", ApiError::invalid_response("HTTP 500"))
}

#[tokio::test]
async fn partial_failure_is_reported_per_entry() {
    let stub = hsinchu_stub();
    let pipeline = pipeline(stub.clone(), IngestOptions::default());
    let catalog = hsinchu_catalog();

    let outcomes: Vec<IngestOutcome> = pipeline
        .ingest("hsinchu", &catalog, None, &Cancellation::new())
        .collect()
        .await;

    assert_eq!(outcomes.len(), 2);

    let record = outcomes[0].as_ref().unwrap();
    assert_eq!(record.name, "陶匠咖啡");
    assert_eq!(record.place_id.as_str(), "abc123");
    assert_eq!(record.rating_value(), Some(4.2));

    let failure = outcomes[1].as_ref().unwrap_err();
    assert_eq!(failure.store_key, "過日子咖啡館 {c03");
    assert_eq!(failure.query_term, "過日子咖啡館");
    assert!(matches!(
        &failure.reason,
        IngestFailure::Api(e) if e.kind == ApiErrorKind::InvalidResponse
    ));

    let records: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
    let summary = summarize("hsinchu", records);
    assert_eq!(summary.count, 1);
    assert!((summary.rating.mean.unwrap() - 4.2).abs() < 1e-9);

    // The taipei entry was never looked up.
    assert_eq!(stub.calls_for("Louisa"), 0);
}

#[tokio::test]
async fn run_collects_report() {
    let pipeline = pipeline(hsinchu_stub(), IngestOptions::default());
    let report = pipeline
        .run("hsinchu", &hsinchu_catalog(), None, &Cancellation::new())
        .await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.attempted(), 2);
}

#[tokio::test]
async fn limit_to_restricts_working_set() {
    let stub = hsinchu_stub();
    let pipeline = pipeline(stub.clone(), IngestOptions::default());
    let allow: BTreeSet<String> = ["陶匠咖啡".to_string()].into();

    let report = pipeline
        .run("hsinchu", &hsinchu_catalog(), Some(&allow), &Cancellation::new())
        .await;

    assert_eq!(report.records.len(), 1);
    assert!(report.failures.is_empty());
    assert_eq!(stub.calls_for("過日子咖啡館"), 0);
}

#[tokio::test]
async fn one_call_per_distinct_term() {
    let stub = StubTransport::new().with_body("陶匠咖啡", ok_body("abc123", "陶匠咖啡", 4.2));
    let pipeline = pipeline(stub.clone(), IngestOptions::default());
    let catalog = vec![
        entry("陶匠咖啡(){c01", "陶匠咖啡()", "hsinchu"),
        entry("陶匠咖啡 {c02", "陶匠咖啡 ", "hsinchu"),
    ];

    let report = pipeline
        .run("hsinchu", &catalog, None, &Cancellation::new())
        .await;
    assert_eq!(report.records.len(), 2);
    assert_eq!(stub.total_calls(), 1);

    // A second run is answered entirely from the cache.
    let again = pipeline
        .run("hsinchu", &catalog, None, &Cancellation::new())
        .await;
    assert_eq!(again.records, report.records);
    assert_eq!(stub.total_calls(), 1);
}

#[tokio::test]
async fn concurrent_run_keeps_catalog_order_and_single_flight() {
    let stub = StubTransport::new()
        .with_body("a咖啡", ok_body("1", "a咖啡", 3.0))
        .with_body("b咖啡", ok_body("2", "b咖啡", 4.0))
        .with_body("c咖啡", ok_body("3", "c咖啡", 5.0))
        .with_delay(Duration::from_millis(5));
    let options = IngestOptions {
        concurrency: 3,
        ..IngestOptions::default()
    };
    let pipeline = pipeline(stub.clone(), options);
    let catalog = vec![
        entry("a{1", "a咖啡", "hsinchu"),
        entry("b{2", "b咖啡", "hsinchu"),
        entry("a{3", "a咖啡 ", "hsinchu"),
        entry("c{4", "c咖啡", "hsinchu"),
    ];

    let report = pipeline
        .run("hsinchu", &catalog, None, &Cancellation::new())
        .await;

    let ids: Vec<&str> = report.records.iter().map(|r| r.place_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "1", "3"]);
    assert_eq!(stub.calls_for("a咖啡"), 1);
    assert_eq!(stub.total_calls(), 3);
}

#[tokio::test]
async fn cancelled_run_dispatches_nothing() {
    let stub = hsinchu_stub();
    let pipeline = pipeline(stub.clone(), IngestOptions::default());
    let cancel = Cancellation::new();
    cancel.cancel();

    let report = pipeline
        .run("hsinchu", &hsinchu_catalog(), None, &cancel)
        .await;

    assert_eq!(report.attempted(), 0);
    assert_eq!(stub.total_calls(), 0);
}

#[tokio::test]
async fn expired_deadline_dispatches_nothing() {
    let stub = hsinchu_stub();
    let pipeline = pipeline(stub.clone(), IngestOptions::default());

    let report = pipeline
        .run("hsinchu", &hsinchu_catalog(), None, &Cancellation::after(Duration::ZERO))
        .await;

    assert_eq!(report.attempted(), 0);
    assert_eq!(stub.total_calls(), 0);
}

#[tokio::test]
async fn cancelling_mid_run_keeps_produced_records() {
    let stub = hsinchu_stub();
    let pipeline = pipeline(stub.clone(), IngestOptions::default());
    let catalog = hsinchu_catalog();
    let cancel = Cancellation::new();

    let mut outcomes = std::pin::pin!(pipeline.ingest("hsinchu", &catalog, None, &cancel));
    let first = outcomes.next().await.unwrap();
    cancel.cancel();
    let rest: Vec<IngestOutcome> = outcomes.collect().await;

    assert_eq!(first.unwrap().place_id.as_str(), "abc123");
    assert!(rest.is_empty());
    assert_eq!(stub.calls_for("過日子咖啡館"), 0);
}

#[tokio::test]
async fn transient_failures_are_retried_up_to_cap() {
    let stub = StubTransport::new().with_failure("陶匠咖啡", ApiError::network("connection reset"));
    let options = IngestOptions {
        concurrency: 1,
        retry: RetryPolicy::new(3, Duration::ZERO),
    };
    let pipeline = pipeline(stub.clone(), options);

    let report = pipeline
        .run("hsinchu", &hsinchu_catalog()[..1], None, &Cancellation::new())
        .await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(stub.calls_for("陶匠咖啡"), 3);
}

#[tokio::test]
async fn retries_stop_at_the_deadline() {
    let stub = StubTransport::new().with_failure("陶匠咖啡", ApiError::network("connection reset"));
    let options = IngestOptions {
        concurrency: 1,
        retry: RetryPolicy::new(4, Duration::from_millis(50)),
    };
    let pipeline = pipeline(stub.clone(), options);

    let report = pipeline
        .run(
            "hsinchu",
            &hsinchu_catalog()[..1],
            None,
            &Cancellation::after(Duration::from_millis(10)),
        )
        .await;

    assert!(matches!(
        &report.failures[0].reason,
        IngestFailure::Api(e) if e.kind == ApiErrorKind::Network
    ));
    assert_eq!(stub.calls_for("陶匠咖啡"), 1);
}

#[tokio::test]
async fn cancelling_during_backoff_stops_retries() {
    let stub = StubTransport::new().with_failure("陶匠咖啡", ApiError::network("connection reset"));
    let options = IngestOptions {
        concurrency: 1,
        retry: RetryPolicy::new(4, Duration::from_millis(20)),
    };
    let pipeline = pipeline(stub.clone(), options);
    let catalog = hsinchu_catalog();
    let cancel = Cancellation::new();

    let run = pipeline.run("hsinchu", &catalog[..1], None, &cancel);
    let stop = async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
    };
    let (report, ()) = tokio::join!(run, stop);

    assert_eq!(report.failures.len(), 1);
    // First call plus at most the retry that was already due.
    assert!(stub.calls_for("陶匠咖啡") <= 2);
}

#[tokio::test]
async fn spent_budget_fails_fast_without_retrying() {
    let stub = StubTransport::new().with_body("陶匠咖啡", ok_body("abc123", "陶匠咖啡", 4.2));
    let config = PlaceApiConfig::new("test-key").with_call_budget(0);
    let client = PlaceApiClient::with_transport(
        stub.clone(),
        &config,
        Arc::new(MemoryResultCache::new()),
    );
    let options = IngestOptions {
        concurrency: 1,
        retry: RetryPolicy::new(4, Duration::from_millis(100)),
    };
    let pipeline = IngestionPipeline::new(Arc::new(client), options);

    let started = tokio::time::Instant::now();
    let report = pipeline
        .run("hsinchu", &hsinchu_catalog(), None, &Cancellation::new())
        .await;

    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| matches!(
        &f.reason,
        IngestFailure::Api(e) if e.kind == ApiErrorKind::BudgetExhausted
    )));
    assert_eq!(stub.total_calls(), 0);
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn invalid_responses_are_not_retried() {
    let stub = hsinchu_stub();
    let options = IngestOptions {
        concurrency: 1,
        retry: RetryPolicy::new(3, Duration::ZERO),
    };
    let pipeline = pipeline(stub.clone(), options);

    pipeline
        .run("hsinchu", &hsinchu_catalog(), None, &Cancellation::new())
        .await;

    assert_eq!(stub.calls_for("過日子咖啡館"), 1);
}

#[tokio::test]
async fn mapping_failures_are_per_entry() {
    let stub = StubTransport::new()
        .with_body("陶匠咖啡", ok_body("abc123", "Starbucks", 4.2))
        .with_body("過日子咖啡館", ok_body("def456", "過日子咖啡館", 7.5));
    let pipeline = pipeline(stub, IngestOptions::default());

    let report = pipeline
        .run("hsinchu", &hsinchu_catalog(), None, &Cancellation::new())
        .await;

    assert!(report.records.is_empty());
    assert!(matches!(
        report.failures[0].reason,
        IngestFailure::Mapping(MappingError::ResultMismatch { .. })
    ));
    assert_eq!(
        report.failures[1].reason,
        IngestFailure::Mapping(MappingError::RatingOutOfRange(7.5))
    );
}

#[tokio::test]
async fn zero_results_is_missing_place_id_and_cached() {
    let stub = StubTransport::new().with_body(
        "陶匠咖啡",
        json!({ "status": "ZERO_RESULTS", "results": [] }).to_string(),
    );
    let pipeline = pipeline(stub.clone(), IngestOptions::default());

    let report = pipeline
        .run("hsinchu", &hsinchu_catalog()[..1], None, &Cancellation::new())
        .await;

    assert_eq!(
        report.failures[0].reason,
        IngestFailure::Mapping(MappingError::MissingPlaceId)
    );
    let cached = pipeline.client().cache().get("陶匠咖啡").unwrap();
    assert_eq!(cached.payload["status"], Value::from("ZERO_RESULTS"));
}

#[tokio::test]
async fn noise_only_name_fails_without_a_call() {
    let stub = StubTransport::new();
    let pipeline = pipeline(stub.clone(), IngestOptions::default());
    let catalog = vec![entry("(){x", "() \u{8}", "hsinchu")];

    let report = pipeline
        .run("hsinchu", &catalog, None, &Cancellation::new())
        .await;

    assert_eq!(report.failures[0].reason, IngestFailure::EmptyName);
    assert_eq!(stub.total_calls(), 0);
}
