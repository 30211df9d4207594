//! Game session, answer, and result models.

use serde::{Deserialize, Serialize};

use crate::scoring::Tier;
use crate::types::{Id, Timestamp};

/// Lifecycle status of a game session. `Lobby` is where matched players
/// gather before a movie is selected; `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Lobby,
    Playing,
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Lobby => "lobby",
            SessionStatus::Playing => "playing",
            SessionStatus::Completed => "completed",
        }
    }
}

/// One play-through of a trivia round, solo or as a matched group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: Id,
    /// For matched games this is the requester whose claim won.
    pub host_user_id: Id,
    /// Selected later for lobby sessions.
    pub movie_id: Option<Id>,
    pub score: i32,
    pub total_questions: i32,
    /// Game mode tag, e.g. `krossfire` or `deepdive`.
    pub mode: String,
    pub status: SessionStatus,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// DTO for creating a session.
///
/// The id is caller-generated (see [`crate::types::new_id`]) so a match
/// claim can publish the session linkage before the row itself exists.
#[derive(Debug, Clone)]
pub struct NewGameSession {
    pub id: Id,
    pub host_user_id: Id,
    pub movie_id: Option<Id>,
    pub total_questions: i32,
    pub mode: String,
    pub status: SessionStatus,
}

/// Partial update for a session. `completed_at` is set automatically by
/// the storage layer when `status` transitions to `Completed`.
#[derive(Debug, Clone, Default)]
pub struct GameSessionPatch {
    pub movie_id: Option<Id>,
    pub score: Option<i32>,
    pub total_questions: Option<i32>,
    pub status: Option<SessionStatus>,
}

/// A recorded answer to one question within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: Id,
    pub session_id: Id,
    pub question_id: Id,
    pub user_answer: String,
    pub is_correct: bool,
    pub answered_at: Timestamp,
}

/// DTO for submitting an answer.
#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub session_id: Id,
    pub question_id: Id,
    pub user_answer: String,
    pub is_correct: bool,
}

/// Final outcome of a completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub session_id: Id,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub tier: Tier,
}
