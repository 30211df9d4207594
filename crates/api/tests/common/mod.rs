use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use krossfire_api::config::ServerConfig;
use krossfire_api::router::build_app_router;
use krossfire_api::state::AppState;
use krossfire_db::memory::MemoryStorage;
use krossfire_generator::FakeGenerator;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        match_timeout_ms: 15_000,
        cleanup_grace_secs: 60,
        gemini_api_key: None,
    }
}

/// Build the full application router over in-memory storage and the
/// synthetic question generator.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing)
/// that production uses. The storage handle is returned so tests can seed
/// movies or display names directly.
pub fn build_test_app() -> (Router, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let config = test_config();
    let state = AppState::new(
        storage.clone(),
        Arc::new(FakeGenerator::default()),
        config.clone(),
    );
    (build_app_router(state, &config), storage)
}

/// Issue a GET request as the given user.
pub async fn get(app: &Router, uri: &str, user_id: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("x-user-id", user_id)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Issue a POST request with a JSON body as the given user.
pub async fn post(app: &Router, uri: &str, user_id: &str, body: Value) -> Response {
    send_json(app, Method::POST, uri, user_id, body).await
}

/// Issue a PATCH request with a JSON body as the given user.
pub async fn patch(app: &Router, uri: &str, user_id: &str, body: Value) -> Response {
    send_json(app, Method::PATCH, uri, user_id, body).await
}

async fn send_json(app: &Router, method: Method, uri: &str, user_id: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user_id)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Read the response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the standard error body shape and return the `code` field.
pub async fn error_code(response: Response, expected_status: StatusCode) -> String {
    assert_eq!(response.status(), expected_status);
    let json = body_json(response).await;
    assert!(json["error"].is_string(), "error body must carry a message");
    json["code"].as_str().unwrap_or_default().to_string()
}
