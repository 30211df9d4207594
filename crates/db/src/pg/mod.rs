//! PostgreSQL implementation of the storage port.
//!
//! One repository unit-struct per table; [`PgStorage`] composes them into
//! the [`Storage`] trait and maps `sqlx` errors into the domain taxonomy
//! (connection-level failures become the retryable `StorageUnavailable`).

use async_trait::async_trait;
use chrono::Duration;

use krossfire_core::error::CoreError;
use krossfire_core::movie::Movie;
use krossfire_core::queue::{NewQueueEntry, QueueEntry, QueueEntryPatch};
use krossfire_core::scoring::fallback_display_name;
use krossfire_core::session::{Answer, GameSession, GameSessionPatch, NewAnswer, NewGameSession};
use krossfire_core::storage::Storage;
use krossfire_core::trivia::{NewTriviaQuestion, TriviaQuestion};
use krossfire_core::types::{Id, Timestamp};

use crate::DbPool;

pub mod movie_repo;
pub mod queue_repo;
pub mod rows;
pub mod session_repo;
pub mod trivia_repo;

pub use movie_repo::{MovieRepo, UserRepo};
pub use queue_repo::QueueRepo;
pub use session_repo::SessionRepo;
pub use trivia_repo::TriviaRepo;

/// Map a sqlx error into the domain taxonomy.
fn storage_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "storage operation failed");
    CoreError::StorageUnavailable(err.to_string())
}

/// PostgreSQL-backed [`Storage`].
#[derive(Clone)]
pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn create_queue_entry(&self, entry: NewQueueEntry) -> Result<QueueEntry, CoreError> {
        let row = QueueRepo::create(&self.pool, &entry)
            .await
            .map_err(storage_error)?;
        row.try_into()
    }

    async fn get_active_queue_entry(
        &self,
        user_id: &str,
    ) -> Result<Option<QueueEntry>, CoreError> {
        let row = QueueRepo::find_active_by_user(&self.pool, user_id)
            .await
            .map_err(storage_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_waiting_players(
        &self,
        exclude_user_id: &str,
    ) -> Result<Vec<QueueEntry>, CoreError> {
        let rows = QueueRepo::list_waiting(&self.pool, exclude_user_id)
            .await
            .map_err(storage_error)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_queue_entry(
        &self,
        id: &str,
        patch: QueueEntryPatch,
    ) -> Result<QueueEntry, CoreError> {
        let row = QueueRepo::update(&self.pool, id, &patch)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| CoreError::NotFound {
                entity: "QueueEntry",
                id: id.to_string(),
            })?;
        row.try_into()
    }

    async fn try_claim_for_match(
        &self,
        entry_ids: &[Id],
        matched_with: &[Id],
        game_session_id: &str,
    ) -> Result<bool, CoreError> {
        QueueRepo::try_claim(&self.pool, entry_ids, matched_with, game_session_id)
            .await
            .map_err(storage_error)
    }

    async fn delete_expired_queue_entries(
        &self,
        now: Timestamp,
        grace: Duration,
    ) -> Result<u64, CoreError> {
        QueueRepo::delete_expired(&self.pool, now, grace)
            .await
            .map_err(storage_error)
    }

    async fn reserve_questions(
        &self,
        user_id: &str,
        movie_id: &str,
        count: usize,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<TriviaQuestion>, CoreError> {
        let rows = TriviaRepo::reserve_for_user(
            &self.pool,
            user_id,
            movie_id,
            count as i64,
            category,
            difficulty,
        )
        .await
        .map_err(storage_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_seen_question_ids(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> Result<Vec<Id>, CoreError> {
        TriviaRepo::seen_question_ids(&self.pool, user_id, movie_id)
            .await
            .map_err(storage_error)
    }

    async fn clear_seen_questions(
        &self,
        user_id: &str,
        movie_id: &str,
        category: Option<&str>,
    ) -> Result<u64, CoreError> {
        TriviaRepo::clear_seen(&self.pool, user_id, movie_id, category)
            .await
            .map_err(storage_error)
    }

    async fn upsert_question(
        &self,
        question: NewTriviaQuestion,
    ) -> Result<TriviaQuestion, CoreError> {
        let row = TriviaRepo::upsert(&self.pool, &question)
            .await
            .map_err(storage_error)?;
        Ok(row.into())
    }

    async fn questions_by_filter(
        &self,
        movie_id: &str,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<TriviaQuestion>, CoreError> {
        let rows = TriviaRepo::list_by_filter(&self.pool, movie_id, category, difficulty)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_movie(&self, id: &str) -> Result<Option<Movie>, CoreError> {
        let row = MovieRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage_error)?;
        Ok(row.map(Into::into))
    }

    async fn create_game_session(
        &self,
        session: NewGameSession,
    ) -> Result<GameSession, CoreError> {
        let row = SessionRepo::create(&self.pool, &session)
            .await
            .map_err(storage_error)?;
        row.try_into()
    }

    async fn get_game_session(&self, id: &str) -> Result<Option<GameSession>, CoreError> {
        let row = SessionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn update_game_session(
        &self,
        id: &str,
        patch: GameSessionPatch,
    ) -> Result<GameSession, CoreError> {
        let row = SessionRepo::update(&self.pool, id, &patch)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| CoreError::NotFound {
                entity: "GameSession",
                id: id.to_string(),
            })?;
        row.try_into()
    }

    async fn sessions_by_user(&self, user_id: &str) -> Result<Vec<GameSession>, CoreError> {
        let rows = SessionRepo::list_by_user(&self.pool, user_id)
            .await
            .map_err(storage_error)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn completed_sessions_by_mode(
        &self,
        mode: &str,
        since: Option<Timestamp>,
    ) -> Result<Vec<GameSession>, CoreError> {
        let rows = SessionRepo::list_completed_by_mode(&self.pool, mode, since)
            .await
            .map_err(storage_error)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_answer(&self, answer: NewAnswer) -> Result<Answer, CoreError> {
        let row = SessionRepo::create_answer(&self.pool, &answer)
            .await
            .map_err(storage_error)?;
        Ok(row.into())
    }

    async fn answers_by_session(&self, session_id: &str) -> Result<Vec<Answer>, CoreError> {
        let rows = SessionRepo::list_answers(&self.pool, session_id)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn display_name(&self, user_id: &str) -> Result<String, CoreError> {
        let name = UserRepo::display_name(&self.pool, user_id)
            .await
            .map_err(storage_error)?;
        Ok(name.unwrap_or_else(|| fallback_display_name(user_id)))
    }
}
