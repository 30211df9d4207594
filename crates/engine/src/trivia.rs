//! Trivia pool and reservation engine.
//!
//! Guarantees fresh, non-repeating questions per (user, movie). The heavy
//! lifting is [`Storage::reserve_questions`], which selects unseen
//! questions and records them as seen in one atomic step; this module
//! layers the reset-and-replenish policy on top:
//!
//! 1. reserve;
//! 2. if short and the user has seen >= 80% of the pool, clear their
//!    history for the movie and reserve again;
//! 3. if still short, generate new questions (hash-deduped upsert) and
//!    reserve the remainder;
//! 4. if still short, fail with [`CoreError::PoolExhausted`].

use std::sync::Arc;

use krossfire_core::error::CoreError;
use krossfire_core::generator::QuestionGenerator;
use krossfire_core::storage::Storage;
use krossfire_core::trivia::{NewTriviaQuestion, TriviaQuestion};
use krossfire_core::types::Id;

/// Fraction of the pool a user must have seen before their history for a
/// movie is wiped and questions start repeating.
pub const RESET_THRESHOLD: f64 = 0.8;

pub const DEFAULT_COUNT: usize = 5;
pub const MAX_COUNT: usize = 10;
pub const DEFAULT_DIFFICULTY: &str = "medium";

/// Parameters for a fresh-questions request.
#[derive(Debug, Clone)]
pub struct FreshQuestionsRequest {
    pub user_id: Id,
    pub movie_id: Id,
    /// 1 to [`MAX_COUNT`]; defaults to [`DEFAULT_COUNT`].
    pub count: Option<usize>,
    pub category: Option<String>,
    /// Defaults to [`DEFAULT_DIFFICULTY`].
    pub difficulty: Option<String>,
}

pub struct TriviaPool {
    storage: Arc<dyn Storage>,
    generator: Arc<dyn QuestionGenerator>,
}

impl TriviaPool {
    pub fn new(storage: Arc<dyn Storage>, generator: Arc<dyn QuestionGenerator>) -> Self {
        Self { storage, generator }
    }

    /// Reserve `count` questions the user has not seen for this movie.
    ///
    /// Returns exactly `count` questions or fails; a `PoolExhausted` error
    /// reports how many were actually available. Questions reserved before
    /// a failure stay marked seen (mark-as-seen-immediately), and questions
    /// persisted by a partially successful generation round are kept.
    pub async fn get_fresh_questions(
        &self,
        request: &FreshQuestionsRequest,
    ) -> Result<Vec<TriviaQuestion>, CoreError> {
        let count = request.count.unwrap_or(DEFAULT_COUNT);
        if count < 1 || count > MAX_COUNT {
            return Err(CoreError::Validation(format!(
                "count must be between 1 and {MAX_COUNT}, got {count}"
            )));
        }
        let difficulty = request.difficulty.as_deref().unwrap_or(DEFAULT_DIFFICULTY);
        let category = request.category.as_deref();
        let user_id = request.user_id.as_str();
        let movie_id = request.movie_id.as_str();

        let mut reserved = self
            .storage
            .reserve_questions(user_id, movie_id, count, category, Some(difficulty))
            .await?;

        if reserved.len() >= count {
            return Ok(reserved);
        }
        tracing::debug!(
            user_id,
            movie_id,
            reserved = reserved.len(),
            requested = count,
            "pool short, evaluating reset"
        );

        // Reset-and-retry once when the user has exhausted most of the pool.
        let pool = self
            .storage
            .questions_by_filter(movie_id, category, Some(difficulty))
            .await?;
        let seen = self.storage.get_seen_question_ids(user_id, movie_id).await?;
        if !pool.is_empty() && seen.len() as f64 / pool.len() as f64 >= RESET_THRESHOLD {
            tracing::info!(
                user_id,
                movie_id,
                seen = seen.len(),
                pool = pool.len(),
                "seen-ratio threshold crossed, resetting history"
            );
            self.storage
                .clear_seen_questions(user_id, movie_id, category)
                .await?;
            // The partial reservation was wiped with the rest of the
            // history, so re-reserve the full count from scratch.
            reserved = self
                .storage
                .reserve_questions(user_id, movie_id, count, category, Some(difficulty))
                .await?;
            if reserved.len() >= count {
                return Ok(reserved);
            }
        }

        // Replenish from the generator and reserve the remainder. Earlier
        // reservations are still marked seen, so only the deficit is drawn.
        let stored = self.generate_for_movie(movie_id, category, difficulty).await?;
        tracing::info!(user_id, movie_id, stored, "replenished question pool");
        let deficit = count - reserved.len();
        let extra = self
            .storage
            .reserve_questions(user_id, movie_id, deficit, category, Some(difficulty))
            .await?;
        reserved.extend(extra);

        if reserved.len() < count {
            return Err(CoreError::PoolExhausted {
                requested: count,
                available: reserved.len(),
            });
        }
        Ok(reserved)
    }

    /// Warm the pool for a set of movies, best-effort: a generator failure
    /// for one movie is logged and does not abort the rest. Returns the
    /// number of upserts performed.
    pub async fn populate_pool(&self, movie_ids: &[Id]) -> Result<usize, CoreError> {
        let mut stored = 0;
        for movie_id in movie_ids {
            match self
                .generate_for_movie(movie_id, None, DEFAULT_DIFFICULTY)
                .await
            {
                Ok(count) => stored += count,
                Err(e) => {
                    tracing::warn!(movie_id = %movie_id, error = %e, "pool warm-up failed for movie");
                }
            }
        }
        Ok(stored)
    }

    /// Generate questions for one movie and upsert them by content hash.
    /// Returns the number of upserts performed.
    async fn generate_for_movie(
        &self,
        movie_id: &str,
        category: Option<&str>,
        difficulty: &str,
    ) -> Result<usize, CoreError> {
        let movie = self
            .storage
            .get_movie(movie_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Movie",
                id: movie_id.to_string(),
            })?;

        let candidates = self.generator.generate(&movie.title).await?;
        let mut stored = 0;
        for candidate in candidates {
            self.storage
                .upsert_question(NewTriviaQuestion::new(
                    movie_id.to_string(),
                    candidate.question,
                    candidate.options,
                    candidate.correct_answer,
                    category.map(str::to_string),
                    difficulty.to_string(),
                ))
                .await?;
            stored += 1;
        }
        Ok(stored)
    }
}
