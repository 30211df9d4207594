//! Storage port consumed by the engines.
//!
//! The engines are transport- and storage-agnostic; everything they need
//! from persistence is expressed here. Two operations carry the whole
//! concurrency contract and MUST be atomic in any implementation:
//!
//! - [`Storage::try_claim_for_match`] — the `waiting -> matched` group
//!   transition. Concurrent pollers for the same group race on it; exactly
//!   one claim succeeds, so exactly one game session linkage is published.
//! - [`Storage::reserve_questions`] — select-unseen plus mark-seen in one
//!   step, so two concurrent requests can never hand the same question to
//!   the same user twice.
//!
//! Everything else is plain CRUD and may be implemented with whatever
//! consistency the backing store offers.

use async_trait::async_trait;
use chrono::Duration;

use crate::error::CoreError;
use crate::movie::Movie;
use crate::queue::{NewQueueEntry, QueueEntry, QueueEntryPatch};
use crate::session::{Answer, GameSession, GameSessionPatch, NewAnswer, NewGameSession};
use crate::trivia::{NewTriviaQuestion, TriviaQuestion};
use crate::types::{Id, Timestamp};

#[async_trait]
pub trait Storage: Send + Sync {
    // -----------------------------------------------------------------------
    // Matchmaking queue
    // -----------------------------------------------------------------------

    /// Insert a new queue entry with status `waiting`.
    async fn create_queue_entry(&self, entry: NewQueueEntry) -> Result<QueueEntry, CoreError>;

    /// The user's entry with status `waiting` or `matched`, if any.
    /// At most one such entry exists per user.
    async fn get_active_queue_entry(&self, user_id: &str)
        -> Result<Option<QueueEntry>, CoreError>;

    /// All `waiting` entries except the given user's, oldest first.
    async fn get_waiting_players(&self, exclude_user_id: &str)
        -> Result<Vec<QueueEntry>, CoreError>;

    /// Apply a partial update to a queue entry.
    async fn update_queue_entry(
        &self,
        id: &str,
        patch: QueueEntryPatch,
    ) -> Result<QueueEntry, CoreError>;

    /// Atomically transition every listed entry from `waiting` to `matched`,
    /// recording the group and the lobby session id.
    ///
    /// Returns `false` without side effects if any listed entry is no longer
    /// `waiting` — the caller lost the race and must re-read its own entry
    /// to observe the winning match.
    async fn try_claim_for_match(
        &self,
        entry_ids: &[Id],
        matched_with: &[Id],
        game_session_id: &str,
    ) -> Result<bool, CoreError>;

    /// Delete entries whose `expires_at` is more than `grace` in the past.
    /// Idempotent; safe to invoke concurrently. Returns the rows removed.
    async fn delete_expired_queue_entries(
        &self,
        now: Timestamp,
        grace: Duration,
    ) -> Result<u64, CoreError>;

    // -----------------------------------------------------------------------
    // Trivia pool
    // -----------------------------------------------------------------------

    /// Reserve up to `count` questions from the (movie, category?, difficulty?)
    /// pool that the user has not seen, creating their seen-records in the
    /// same atomic step.
    ///
    /// Mark-as-seen-immediately: the records are durable before this call
    /// returns, which is the sole guarantee against repeats. Reservations of
    /// abandoned rounds stay consumed until the seen-ratio reset fires.
    async fn reserve_questions(
        &self,
        user_id: &str,
        movie_id: &str,
        count: usize,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<TriviaQuestion>, CoreError>;

    /// Question ids the user has seen for this movie.
    async fn get_seen_question_ids(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> Result<Vec<Id>, CoreError>;

    /// Bulk-delete the user's seen-records for a movie (optionally narrowed
    /// to one category). Returns the records removed.
    async fn clear_seen_questions(
        &self,
        user_id: &str,
        movie_id: &str,
        category: Option<&str>,
    ) -> Result<u64, CoreError>;

    /// Insert a question, or return the existing row when one with the same
    /// content hash already exists. Idempotent under concurrent generation.
    async fn upsert_question(
        &self,
        question: NewTriviaQuestion,
    ) -> Result<TriviaQuestion, CoreError>;

    /// All questions for a movie, optionally narrowed by category and
    /// difficulty.
    async fn questions_by_filter(
        &self,
        movie_id: &str,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<TriviaQuestion>, CoreError>;

    // -----------------------------------------------------------------------
    // Movies (read-only projection of the catalogue)
    // -----------------------------------------------------------------------

    async fn get_movie(&self, id: &str) -> Result<Option<Movie>, CoreError>;

    // -----------------------------------------------------------------------
    // Game sessions and answers
    // -----------------------------------------------------------------------

    async fn create_game_session(&self, session: NewGameSession)
        -> Result<GameSession, CoreError>;

    async fn get_game_session(&self, id: &str) -> Result<Option<GameSession>, CoreError>;

    /// Apply a partial update; sets `completed_at` when the patch moves the
    /// session to `completed`.
    async fn update_game_session(
        &self,
        id: &str,
        patch: GameSessionPatch,
    ) -> Result<GameSession, CoreError>;

    async fn sessions_by_user(&self, user_id: &str) -> Result<Vec<GameSession>, CoreError>;

    /// Completed sessions for a mode, optionally only those created at or
    /// after `since`. Feeds the leaderboard aggregator.
    async fn completed_sessions_by_mode(
        &self,
        mode: &str,
        since: Option<Timestamp>,
    ) -> Result<Vec<GameSession>, CoreError>;

    async fn create_answer(&self, answer: NewAnswer) -> Result<Answer, CoreError>;

    async fn answers_by_session(&self, session_id: &str) -> Result<Vec<Answer>, CoreError>;

    // -----------------------------------------------------------------------
    // Users (display only)
    // -----------------------------------------------------------------------

    /// Human-readable name for leaderboard rows. Implementations without a
    /// user store fall back to [`crate::scoring::fallback_display_name`].
    async fn display_name(&self, user_id: &str) -> Result<String, CoreError>;
}
