//! Shared test helpers for relay integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use storycast_relay::hub::RelayHub;
use storycast_relay::state::AppState;

/// Build the relay router over a fresh hub, returning both so tests can
/// seed the session table.
pub fn build_test_app() -> (Router, Arc<RelayHub>) {
    let hub = Arc::new(RelayHub::default());
    let app = storycast_relay::router(AppState::new(Arc::clone(&hub)));
    (app, hub)
}

/// Send a GET request and return the status and JSON body.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return only the status.
pub async fn get_status(app: Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    app.oneshot(request).await.unwrap().status()
}
