//! Repository for `trivia_questions` and `user_seen_questions`.

use sqlx::types::Json;
use sqlx::PgPool;

use krossfire_core::trivia::NewTriviaQuestion;

use super::rows::TriviaQuestionRow;

const COLUMNS: &str = "id, movie_id, question, options, correct_answer, \
                       category, difficulty, content_hash, created_at";

/// Question pool and seen-record operations.
pub struct TriviaRepo;

impl TriviaRepo {
    /// Atomically reserve up to `count` unseen questions for a user.
    ///
    /// One statement selects unseen questions from the filtered pool and
    /// inserts their seen-records, so two concurrent requests can never
    /// reserve the same question for the same user. `FOR UPDATE SKIP
    /// LOCKED` keeps concurrent reservations from blocking on each other.
    pub async fn reserve_for_user(
        pool: &PgPool,
        user_id: &str,
        movie_id: &str,
        count: i64,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<TriviaQuestionRow>, sqlx::Error> {
        let query = format!(
            "WITH candidate AS (
                 SELECT q.id FROM trivia_questions q
                 WHERE q.movie_id = $2
                   AND ($3::text IS NULL OR q.category = $3)
                   AND ($4::text IS NULL OR q.difficulty = $4)
                   AND NOT EXISTS (
                       SELECT 1 FROM user_seen_questions s
                       WHERE s.user_id = $1
                         AND s.movie_id = $2
                         AND s.question_id = q.id)
                 ORDER BY RANDOM()
                 LIMIT $5
                 FOR UPDATE OF q SKIP LOCKED
             ), marked AS (
                 INSERT INTO user_seen_questions (user_id, movie_id, question_id)
                 SELECT $1, $2, id FROM candidate
                 ON CONFLICT DO NOTHING
                 RETURNING question_id
             )
             SELECT {COLUMNS} FROM trivia_questions
             WHERE id IN (SELECT question_id FROM marked)"
        );
        sqlx::query_as::<_, TriviaQuestionRow>(&query)
            .bind(user_id)
            .bind(movie_id)
            .bind(category)
            .bind(difficulty)
            .bind(count)
            .fetch_all(pool)
            .await
    }

    /// Question ids the user has seen for a movie.
    pub async fn seen_question_ids(
        pool: &PgPool,
        user_id: &str,
        movie_id: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT question_id FROM user_seen_questions
             WHERE user_id = $1 AND movie_id = $2",
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Bulk-delete seen-records for a (user, movie), optionally narrowed to
    /// one question category. Returns the count of deleted records.
    pub async fn clear_seen(
        pool: &PgPool,
        user_id: &str,
        movie_id: &str,
        category: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_seen_questions s
             WHERE s.user_id = $1 AND s.movie_id = $2
               AND ($3::text IS NULL OR EXISTS (
                   SELECT 1 FROM trivia_questions q
                   WHERE q.id = s.question_id AND q.category = $3))",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(category)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Insert a question, or return the existing row on a content-hash
    /// conflict. Safe under concurrent generation for the same movie.
    pub async fn upsert(
        pool: &PgPool,
        input: &NewTriviaQuestion,
    ) -> Result<TriviaQuestionRow, sqlx::Error> {
        let insert = format!(
            "INSERT INTO trivia_questions
                 (movie_id, question, options, correct_answer, category, difficulty, content_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (content_hash) DO NOTHING
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, TriviaQuestionRow>(&insert)
            .bind(&input.movie_id)
            .bind(&input.question)
            .bind(Json(&input.options))
            .bind(&input.correct_answer)
            .bind(input.category.as_deref())
            .bind(&input.difficulty)
            .bind(&input.content_hash)
            .fetch_optional(pool)
            .await?;

        match inserted {
            Some(row) => Ok(row),
            // Conflict: another writer got there first; fetch their row.
            None => {
                let select =
                    format!("SELECT {COLUMNS} FROM trivia_questions WHERE content_hash = $1");
                sqlx::query_as::<_, TriviaQuestionRow>(&select)
                    .bind(&input.content_hash)
                    .fetch_one(pool)
                    .await
            }
        }
    }

    /// All questions for a movie, optionally narrowed by category and
    /// difficulty.
    pub async fn list_by_filter(
        pool: &PgPool,
        movie_id: &str,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<TriviaQuestionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM trivia_questions
             WHERE movie_id = $1
               AND ($2::text IS NULL OR category = $2)
               AND ($3::text IS NULL OR difficulty = $3)
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, TriviaQuestionRow>(&query)
            .bind(movie_id)
            .bind(category)
            .bind(difficulty)
            .fetch_all(pool)
            .await
    }
}
