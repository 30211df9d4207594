//! Row structs mapping PostgreSQL rows to the domain types.
//!
//! Status columns are stored as text and parsed on the way out; enum
//! parsing failures indicate schema drift and surface as internal errors.

use sqlx::types::Json;
use sqlx::FromRow;

use krossfire_core::error::CoreError;
use krossfire_core::movie::Movie;
use krossfire_core::queue::{QueueEntry, QueueStatus};
use krossfire_core::session::{Answer, GameSession, SessionStatus};
use krossfire_core::trivia::TriviaQuestion;
use krossfire_core::types::Timestamp;

#[derive(Debug, FromRow)]
pub struct QueueEntryRow {
    pub id: String,
    pub user_id: String,
    pub interests: Json<Vec<String>>,
    pub status: String,
    pub matched_with: Option<Json<Vec<String>>>,
    pub game_session_id: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl TryFrom<QueueEntryRow> for QueueEntry {
    type Error = CoreError;

    fn try_from(row: QueueEntryRow) -> Result<Self, CoreError> {
        Ok(QueueEntry {
            id: row.id,
            user_id: row.user_id,
            interests: row.interests.0,
            status: parse_queue_status(&row.status)?,
            matched_with: row.matched_with.map(|j| j.0),
            game_session_id: row.game_session_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct TriviaQuestionRow {
    pub id: String,
    pub movie_id: String,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: String,
    pub category: Option<String>,
    pub difficulty: String,
    pub content_hash: String,
    pub created_at: Timestamp,
}

impl From<TriviaQuestionRow> for TriviaQuestion {
    fn from(row: TriviaQuestionRow) -> Self {
        TriviaQuestion {
            id: row.id,
            movie_id: row.movie_id,
            question: row.question,
            options: row.options.0,
            correct_answer: row.correct_answer,
            category: row.category,
            difficulty: row.difficulty,
            content_hash: row.content_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct GameSessionRow {
    pub id: String,
    pub host_user_id: String,
    pub movie_id: Option<String>,
    pub score: i32,
    pub total_questions: i32,
    pub mode: String,
    pub status: String,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl TryFrom<GameSessionRow> for GameSession {
    type Error = CoreError;

    fn try_from(row: GameSessionRow) -> Result<Self, CoreError> {
        Ok(GameSession {
            id: row.id,
            host_user_id: row.host_user_id,
            movie_id: row.movie_id,
            score: row.score,
            total_questions: row.total_questions,
            mode: row.mode,
            status: parse_session_status(&row.status)?,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct AnswerRow {
    pub id: String,
    pub session_id: String,
    pub question_id: String,
    pub user_answer: String,
    pub is_correct: bool,
    pub answered_at: Timestamp,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            session_id: row.session_id,
            question_id: row.question_id,
            user_answer: row.user_answer,
            is_correct: row.is_correct,
            answered_at: row.answered_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct MovieRow {
    pub id: String,
    pub title: String,
    pub genre: Option<String>,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Movie {
            id: row.id,
            title: row.title,
            genre: row.genre,
        }
    }
}

pub fn parse_queue_status(raw: &str) -> Result<QueueStatus, CoreError> {
    match raw {
        "waiting" => Ok(QueueStatus::Waiting),
        "matched" => Ok(QueueStatus::Matched),
        "expired" => Ok(QueueStatus::Expired),
        other => Err(CoreError::Internal(format!(
            "unknown queue status in database: {other:?}"
        ))),
    }
}

pub fn parse_session_status(raw: &str) -> Result<SessionStatus, CoreError> {
    match raw {
        "lobby" => Ok(SessionStatus::Lobby),
        "playing" => Ok(SessionStatus::Playing),
        "completed" => Ok(SessionStatus::Completed),
        other => Err(CoreError::Internal(format!(
            "unknown session status in database: {other:?}"
        ))),
    }
}
