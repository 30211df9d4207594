//! Handlers for game sessions, answers, and results.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use krossfire_core::session::{GameSessionPatch, NewAnswer, NewGameSession, SessionStatus};
use krossfire_core::types::new_id;

use crate::error::AppResult;
use crate::extract::UserId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub movie_id: Option<String>,
    /// Defaults to `krossfire`.
    pub mode: Option<String>,
    /// Defaults to 5.
    pub total_questions: Option<i32>,
}

/// POST /api/sessions
///
/// Create a standalone session in the lobby state, hosted by the caller.
pub async fn create(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<CreateSessionRequest>,
) -> AppResult<impl IntoResponse> {
    let session = state
        .games
        .create_session(NewGameSession {
            id: new_id(),
            host_user_id: user_id,
            movie_id: request.movie_id,
            total_questions: request.total_questions.unwrap_or(5),
            mode: request.mode.unwrap_or_else(|| "krossfire".into()),
            status: SessionStatus::Lobby,
        })
        .await?;
    Ok(Json(session))
}

/// GET /api/sessions
///
/// The caller's sessions, newest first.
pub async fn list_mine(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<impl IntoResponse> {
    let sessions = state.games.user_sessions(&user_id).await?;
    Ok(Json(sessions))
}

/// GET /api/sessions/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let session = state.games.get_session(&id).await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub movie_id: Option<String>,
    pub score: Option<i32>,
    pub total_questions: Option<i32>,
    pub status: Option<SessionStatus>,
}

/// PATCH /api/sessions/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSessionRequest>,
) -> AppResult<impl IntoResponse> {
    let session = state
        .games
        .update_session(
            &id,
            GameSessionPatch {
                movie_id: request.movie_id,
                score: request.score,
                total_questions: request.total_questions,
                status: request.status,
            },
        )
        .await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: String,
    pub user_answer: String,
    pub is_correct: bool,
}

/// POST /api/sessions/{id}/answers
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SubmitAnswerRequest>,
) -> AppResult<impl IntoResponse> {
    let answer = state
        .games
        .submit_answer(NewAnswer {
            session_id: id,
            question_id: request.question_id,
            user_answer: request.user_answer,
            is_correct: request.is_correct,
        })
        .await?;
    Ok(Json(answer))
}

/// GET /api/sessions/{id}/answers
pub async fn list_answers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let answers = state.games.session_answers(&id).await?;
    Ok(Json(answers))
}

/// GET /api/sessions/{id}/result
///
/// Final result with tier classification. Completes the session if it is
/// still open.
pub async fn result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let result = state.games.finish_session(&id, None).await?;
    Ok(Json(result))
}
