//! Repository for the `game_sessions` and `answers` tables.

use sqlx::PgPool;

use krossfire_core::session::{GameSessionPatch, NewAnswer, NewGameSession, SessionStatus};
use krossfire_core::types::Timestamp;

use super::rows::{AnswerRow, GameSessionRow};

const SESSION_COLUMNS: &str = "id, host_user_id, movie_id, score, total_questions, \
                               mode, status, created_at, completed_at";

const ANSWER_COLUMNS: &str = "id, session_id, question_id, user_answer, is_correct, answered_at";

/// Game session and answer persistence.
pub struct SessionRepo;

impl SessionRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewGameSession,
    ) -> Result<GameSessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO game_sessions (id, host_user_id, movie_id, total_questions, mode, status)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, GameSessionRow>(&query)
            .bind(&input.id)
            .bind(&input.host_user_id)
            .bind(input.movie_id.as_deref())
            .bind(input.total_questions)
            .bind(&input.mode)
            .bind(input.status.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<GameSessionRow>, sqlx::Error> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM game_sessions WHERE id = $1");
        sqlx::query_as::<_, GameSessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a partial update. `completed_at` is stamped in the same
    /// statement when the patch moves the session to `completed`.
    pub async fn update(
        pool: &PgPool,
        id: &str,
        patch: &GameSessionPatch,
    ) -> Result<Option<GameSessionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE game_sessions SET
                 movie_id        = COALESCE($2, movie_id),
                 score           = COALESCE($3, score),
                 total_questions = COALESCE($4, total_questions),
                 status          = COALESCE($5, status),
                 completed_at    = CASE
                     WHEN $5 = 'completed' AND status <> 'completed' THEN NOW()
                     ELSE completed_at
                 END
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, GameSessionRow>(&query)
            .bind(id)
            .bind(patch.movie_id.as_deref())
            .bind(patch.score)
            .bind(patch.total_questions)
            .bind(patch.status.map(SessionStatus::as_str))
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Vec<GameSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions
             WHERE host_user_id = $1
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, GameSessionRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Completed sessions for a mode, optionally bounded below by `since`.
    pub async fn list_completed_by_mode(
        pool: &PgPool,
        mode: &str,
        since: Option<Timestamp>,
    ) -> Result<Vec<GameSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions
             WHERE mode = $1 AND status = 'completed'
               AND ($2::timestamptz IS NULL OR created_at >= $2)"
        );
        sqlx::query_as::<_, GameSessionRow>(&query)
            .bind(mode)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    pub async fn create_answer(pool: &PgPool, input: &NewAnswer) -> Result<AnswerRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO answers (session_id, question_id, user_answer, is_correct)
             VALUES ($1, $2, $3, $4)
             RETURNING {ANSWER_COLUMNS}"
        );
        sqlx::query_as::<_, AnswerRow>(&query)
            .bind(&input.session_id)
            .bind(&input.question_id)
            .bind(&input.user_answer)
            .bind(input.is_correct)
            .fetch_one(pool)
            .await
    }

    pub async fn list_answers(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Vec<AnswerRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ANSWER_COLUMNS} FROM answers
             WHERE session_id = $1
             ORDER BY answered_at ASC, id ASC"
        );
        sqlx::query_as::<_, AnswerRow>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }
}
