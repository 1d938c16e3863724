//! Behaviour tests for the dashboard JSON API

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use brentscope_tests::*;
use brentscope_web::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const ORIGIN: &str = "http://localhost:3000";

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
        .await
        .expect("infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[tokio::test]
async fn historical_prices_are_served_row_for_row() {
    // Given: a three-row price file
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(
        dir.path().join("BrentOilprices.csv"),
        "Date,Price\n2020-01-01,50\n2020-01-02,51\n2020-01-03,49\n",
    )
    .expect("prices");
    let app = router(AppState::load(data_config(dir.path())), ORIGIN).expect("router");

    // When: the dashboard asks for historical prices
    let (status, body) = get(app, "/api/data/historical-prices").await;

    // Then: every row comes back in file order
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"Date": "2020-01-01", "Price": 50},
            {"Date": "2020-01-02", "Price": 51},
            {"Date": "2020-01-03", "Price": 49}
        ])
    );
}

#[tokio::test]
async fn merged_history_is_served_with_missing_cells_as_null() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(
        dir.path().join("merged_data.csv"),
        "Date,GDP Growth (%),Price\n1987-05-20,,18.63\n1987-05-21,3.4,18.45\n",
    )
    .expect("merged");
    let app = router(AppState::load(data_config(dir.path())), ORIGIN).expect("router");

    let (status, body) = get(app, "/api/data/merged_oil_price_history").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["GDP Growth (%)"], Value::Null);
    assert_eq!(body[1]["GDP Growth (%)"], 3.4);
    assert_eq!(body[1]["Price"], 18.45);
}

#[tokio::test]
async fn missing_dataset_is_a_server_error_with_a_message() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = router(AppState::load(data_config(dir.path())), ORIGIN).expect("router");

    for uri in ["/api/data/events", "/api/data/forecast", "/api/data/historical-prices"] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
