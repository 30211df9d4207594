//! Handlers for the trivia question pool.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use krossfire_engine::FreshQuestionsRequest;

use crate::error::AppResult;
use crate::extract::UserId;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct QuestionsRequest {
    pub movie_id: String,
    /// 1 to 10 questions; defaults to 5.
    #[validate(range(min = 1, max = 10, message = "count must be between 1 and 10"))]
    pub count: Option<usize>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

/// POST /api/trivia/questions
///
/// Reserve fresh questions for the caller; may trigger a history reset or
/// generator replenishment when the pool runs low.
pub async fn questions(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<QuestionsRequest>,
) -> AppResult<impl IntoResponse> {
    request.validate()?;
    let questions = state
        .trivia
        .get_fresh_questions(&FreshQuestionsRequest {
            user_id,
            movie_id: request.movie_id,
            count: request.count,
            category: request.category,
            difficulty: request.difficulty,
        })
        .await?;
    Ok(Json(questions))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PopulateRequest {
    #[validate(length(min = 1, message = "movie_ids must not be empty"))]
    pub movie_ids: Vec<String>,
}

/// POST /api/trivia/populate
///
/// Warm the pool for a set of movies. Best-effort per movie.
pub async fn populate(
    State(state): State<AppState>,
    Json(request): Json<PopulateRequest>,
) -> AppResult<impl IntoResponse> {
    request.validate()?;
    let stored = state.trivia.populate_pool(&request.movie_ids).await?;
    Ok(Json(json!({ "stored": stored })))
}
