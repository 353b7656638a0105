//! Shared helpers for API integration tests.
//!
//! The router runs over the in-memory store with a manual clock so tests
//! can drive token expiry without sleeping.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use tasklane_api::config::ServerConfig;
use tasklane_api::routes;
use tasklane_api::state::AppState;
use tasklane_core::clock::ManualClock;
use tasklane_core::memory::MemoryStore;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        undo_ttl_secs: 5,
        db_max_connections: 1,
    }
}

/// A router plus the clock driving it.
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses.
pub fn build_test_app() -> TestApp {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let state = AppState::new(store, clock.clone(), test_config());

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::PATCH])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router::<MemoryStore>())
        .nest("/api/v1", routes::api_routes::<MemoryStore>())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp { router, clock }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    json_request(app, Method::POST, uri, body).await
}

pub async fn patch_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    json_request(app, Method::PATCH, uri, body).await
}

async fn json_request(
    app: &Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create an item and return `(id, undo_token)`.
pub async fn create_item(app: &Router, body: serde_json::Value) -> (String, String) {
    let response = post_json(app, "/api/v1/items", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    (
        json["data"]["id"].as_str().unwrap().to_string(),
        json["undo_token"].as_str().unwrap().to_string(),
    )
}
