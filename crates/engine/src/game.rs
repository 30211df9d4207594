//! Game sessions, answers, results, and leaderboards.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use krossfire_core::error::CoreError;
use krossfire_core::scoring::{
    aggregate_leaderboard, classify_tier, percentage, LeaderboardRow, Period,
};
use krossfire_core::session::{
    Answer, GameResult, GameSession, GameSessionPatch, NewAnswer, NewGameSession, SessionStatus,
};
use krossfire_core::storage::Storage;
use krossfire_core::types::Id;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

pub struct GameService {
    storage: Arc<dyn Storage>,
}

impl GameService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn create_session(&self, session: NewGameSession) -> Result<GameSession, CoreError> {
        let created = self.storage.create_game_session(session).await?;
        tracing::info!(session_id = %created.id, host = %created.host_user_id, mode = %created.mode, "game session created");
        Ok(created)
    }

    pub async fn get_session(&self, id: &str) -> Result<GameSession, CoreError> {
        self.storage
            .get_game_session(id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "GameSession",
                id: id.to_string(),
            })
    }

    pub async fn update_session(
        &self,
        id: &str,
        patch: GameSessionPatch,
    ) -> Result<GameSession, CoreError> {
        self.storage.update_game_session(id, patch).await
    }

    pub async fn user_sessions(&self, user_id: &str) -> Result<Vec<GameSession>, CoreError> {
        self.storage.sessions_by_user(user_id).await
    }

    /// Record an answer against an existing session.
    pub async fn submit_answer(&self, answer: NewAnswer) -> Result<Answer, CoreError> {
        // Reject answers for sessions that never existed.
        self.get_session(&answer.session_id).await?;
        self.storage.create_answer(answer).await
    }

    pub async fn session_answers(&self, session_id: &str) -> Result<Vec<Answer>, CoreError> {
        self.storage.answers_by_session(session_id).await
    }

    /// Complete a session and compute its result.
    ///
    /// Applies the final score if given, transitions the session to
    /// `completed` (storage stamps `completed_at`), and classifies the
    /// tier. Finishing an already completed session recomputes the result
    /// without changing state.
    pub async fn finish_session(
        &self,
        id: &str,
        final_score: Option<i32>,
    ) -> Result<GameResult, CoreError> {
        let session = self.get_session(id).await?;

        let session = if session.status == SessionStatus::Completed && final_score.is_none() {
            session
        } else {
            self.storage
                .update_game_session(
                    id,
                    GameSessionPatch {
                        score: final_score,
                        status: Some(SessionStatus::Completed),
                        ..Default::default()
                    },
                )
                .await?
        };

        let tier = classify_tier(session.score, session.total_questions);
        tracing::info!(session_id = %session.id, score = session.score, tier = ?tier, "session finished");
        Ok(GameResult {
            session_id: session.id,
            score: session.score,
            total_questions: session.total_questions,
            percentage: percentage(session.score, session.total_questions),
            tier,
        })
    }

    /// Ranked leaderboard for a game mode over an optional time window.
    pub async fn leaderboard(
        &self,
        mode: &str,
        period: Period,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardRow>, CoreError> {
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
        let since = period.cutoff(Utc::now());
        let sessions = self.storage.completed_sessions_by_mode(mode, since).await?;

        let mut display_names: HashMap<Id, String> = HashMap::new();
        for session in &sessions {
            if !display_names.contains_key(&session.host_user_id) {
                let name = self.storage.display_name(&session.host_user_id).await?;
                display_names.insert(session.host_user_id.clone(), name);
            }
        }

        Ok(aggregate_leaderboard(&sessions, &display_names, limit))
    }
}
