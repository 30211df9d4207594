//! Handlers for the matchmaking queue.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::error::AppResult;
use crate::extract::UserId;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct JoinRequest {
    /// Raw interest tags; normalization happens in the engine.
    #[validate(length(min = 1, message = "interests must not be empty"))]
    pub interests: Vec<String>,
}

/// POST /api/matchmaking/join
///
/// Join the queue, or refresh the caller's existing entry.
pub async fn join(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<JoinRequest>,
) -> AppResult<impl IntoResponse> {
    request.validate()?;
    let entry = state.matchmaking.join_queue(&user_id, &request.interests).await?;
    Ok(Json(entry))
}

/// GET /api/matchmaking/status
///
/// One matchmaking poll; clients call this every couple of seconds.
pub async fn status(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<impl IntoResponse> {
    let result = state.matchmaking.find_match(&user_id).await?;
    Ok(Json(result))
}

/// POST /api/matchmaking/leave
pub async fn leave(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<impl IntoResponse> {
    state.matchmaking.leave_queue(&user_id).await?;
    Ok(Json(json!({ "left": true })))
}

/// POST /api/matchmaking/cleanup
///
/// Batch-delete long-expired queue entries. Safe to invoke from multiple
/// schedulers at once.
pub async fn cleanup(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let removed = state.matchmaking.cleanup_expired_entries().await?;
    Ok(Json(json!({ "removed": removed })))
}
