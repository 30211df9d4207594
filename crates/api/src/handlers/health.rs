//! Health check endpoint.

use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
