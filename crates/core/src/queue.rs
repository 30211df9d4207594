//! Matchmaking queue entry model and DTOs.

use serde::{Deserialize, Serialize};

use crate::types::{Id, Timestamp};

/// Lifecycle status of a queue entry.
///
/// `Waiting` and `Matched` are the "active" states; the invariant is at most
/// one active entry per user at any time. `Expired` is terminal and the row
/// is eventually removed by the periodic cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Waiting,
    Matched,
    Expired,
}

impl QueueStatus {
    pub fn is_active(self) -> bool {
        matches!(self, QueueStatus::Waiting | QueueStatus::Matched)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::Matched => "matched",
            QueueStatus::Expired => "expired",
        }
    }
}

/// A user's standing request to be matched into a trivia group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Id,
    pub user_id: Id,
    /// Normalized interest tags (see [`crate::interests::normalize`]).
    pub interests: Vec<String>,
    pub status: QueueStatus,
    /// User ids of the matched group, requester included, host first.
    pub matched_with: Option<Vec<Id>>,
    pub game_session_id: Option<Id>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

/// DTO for inserting a new queue entry.
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub user_id: Id,
    pub interests: Vec<String>,
    pub expires_at: Timestamp,
}

/// Partial update for a queue entry. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct QueueEntryPatch {
    pub status: Option<QueueStatus>,
    pub matched_with: Option<Vec<Id>>,
    pub game_session_id: Option<Id>,
    pub expires_at: Option<Timestamp>,
}

/// Result of a `find_match` poll.
///
/// A successful match always carries the full player list (requester
/// included, 2 or 3 players) and the lobby session id; partial matches are
/// never exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_players: Option<Vec<Id>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_session_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_time_ms: Option<i64>,
}

impl MatchResult {
    /// A "not yet" result: the caller should keep polling.
    pub fn waiting(wait_time_ms: i64) -> Self {
        Self {
            matched: false,
            matched_players: None,
            game_session_id: None,
            wait_time_ms: Some(wait_time_ms),
        }
    }

    /// No active entry for this user (never joined, or already expired).
    pub fn not_in_queue() -> Self {
        Self {
            matched: false,
            matched_players: None,
            game_session_id: None,
            wait_time_ms: None,
        }
    }

    pub fn matched(players: Vec<Id>, game_session_id: Id, wait_time_ms: Option<i64>) -> Self {
        Self {
            matched: true,
            matched_players: Some(players),
            game_session_id: Some(game_session_id),
            wait_time_ms,
        }
    }
}
