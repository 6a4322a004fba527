#![cfg(feature = "web")]
//! HTTP surface: status codes, JSON bodies and cache behaviour behind the router.

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use http_body_util::BodyExt;
use quotecache::adapters::memory_store::MemoryStore;
use quotecache::adapters::web::{AppState, build_router};
use quotecache::ports::store_port::PriceStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_app(store: Arc<MemoryStore>, quotes: Arc<RecordingQuotes>) -> Router {
    build_router(AppState {
        store,
        quotes,
        clock: Arc::new(FixedClock(date(2024, 3, 10))),
    })
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn historical_by_date_returns_json_prices() {
    let store = Arc::new(MemoryStore::new());
    let quotes = Arc::new(RecordingQuotes::new().with_prices(vec![aapl_20190220()]));
    let app = create_test_app(store.clone(), quotes.clone());

    let (status, body) = get(app.clone(), "/prices/historical?symbol=AAPL&date=20190220").await;
    assert_eq!(status, StatusCode::OK);
    let prices = body.as_array().unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0]["symbol"], "AAPL");
    assert_eq!(prices[0]["date"], "2019-02-20");
    assert_eq!(prices[0]["close"], "43.0075");

    let (status, _) = get(app, "/prices/historical?symbol=AAPL&date=20190220").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quotes.call_count(), 1);
    assert_eq!(stored(&*store), 1);
}

#[tokio::test]
async fn missing_symbol_is_not_found() {
    let app = create_test_app(Arc::new(MemoryStore::new()), Arc::new(RecordingQuotes::new()));

    let (status, body) = get(app.clone(), "/prices/historical?range=5d").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "symbol is required");

    let (status, _) = get(app, "/prices/historical?symbol=&range=5d").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_range_or_date_is_bad_request() {
    let quotes = Arc::new(RecordingQuotes::new());
    let app = create_test_app(Arc::new(MemoryStore::new()), quotes.clone());

    let (status, body) = get(app.clone(), "/prices/historical?symbol=AAPL&range=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("range"));

    let (status, body) = get(app.clone(), "/prices/historical?symbol=AAPL&range=max&date=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("date"));

    let (status, _) = get(app, "/prices/historical?symbol=AAPL&date=2019022").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(quotes.call_count(), 0);
}

#[tokio::test]
async fn remote_failure_is_bad_gateway() {
    let quotes = Arc::new(RecordingQuotes::new().with_failure(date(2019, 2, 20), "HTTP 503"));
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store.clone(), quotes);

    let (status, body) = get(app, "/prices/historical?symbol=AAPL&date=20190220").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("HTTP 503"));
    assert_eq!(stored(&*store), 0);
}

#[tokio::test]
async fn cached_lists_stored_prices() {
    let store = Arc::new(MemoryStore::new());
    store.insert(&aapl_20190220()).unwrap();
    store
        .insert(&make_price("MSFT", date(2019, 2, 20), rust_decimal_macros::dec!(107.15)))
        .unwrap();
    let app = create_test_app(store, Arc::new(RecordingQuotes::new()));

    let (status, body) = get(app.clone(), "/prices/cached").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = get(app, "/prices/cached?symbol=MSFT").await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["price"]["symbol"], "MSFT");
}

#[tokio::test]
async fn symbols_and_last_prices_pass_through() {
    let quotes = Arc::new(RecordingQuotes::new().with_symbols(&["A", "AA"]));
    let app = create_test_app(Arc::new(MemoryStore::new()), quotes.clone());

    let (status, body) = get(app.clone(), "/symbols").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[1]["symbol"], "AA");

    let (status, body) = get(app, "/prices/last?symbols=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(Vec::new()));
    assert_eq!(quotes.calls(), vec!["symbols"]);
}

#[tokio::test]
async fn unknown_route_is_json_not_found() {
    let app = create_test_app(Arc::new(MemoryStore::new()), Arc::new(RecordingQuotes::new()));
    let (status, body) = get(app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no such route");
}
