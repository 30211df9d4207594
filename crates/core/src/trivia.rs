//! Trivia question model and DTOs.

use serde::{Deserialize, Serialize};

use crate::hashing::question_content_hash;
use crate::types::{Id, Timestamp};

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// A stored trivia question. Rows are created idempotently by the
/// hash-keyed upsert path and are otherwise immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriviaQuestion {
    pub id: Id,
    pub movie_id: Id,
    pub question: String,
    /// Exactly [`OPTION_COUNT`] unique answer options.
    pub options: Vec<String>,
    /// Always one of `options`.
    pub correct_answer: String,
    pub category: Option<String>,
    pub difficulty: String,
    /// Dedup key; see [`question_content_hash`].
    pub content_hash: String,
    pub created_at: Timestamp,
}

/// DTO for the idempotent question upsert.
#[derive(Debug, Clone)]
pub struct NewTriviaQuestion {
    pub movie_id: Id,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub category: Option<String>,
    pub difficulty: String,
    pub content_hash: String,
}

impl NewTriviaQuestion {
    /// Build an upsert DTO, computing the content hash from text + options.
    pub fn new(
        movie_id: Id,
        question: String,
        options: Vec<String>,
        correct_answer: String,
        category: Option<String>,
        difficulty: String,
    ) -> Self {
        let content_hash = question_content_hash(&question, &options);
        Self {
            movie_id,
            question,
            options,
            correct_answer,
            category,
            difficulty,
            content_hash,
        }
    }
}
