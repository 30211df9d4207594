//! Repository for the `matchmaking_queue` table.

use chrono::Duration;
use sqlx::types::Json;
use sqlx::PgPool;

use krossfire_core::queue::{NewQueueEntry, QueueEntryPatch};
use krossfire_core::types::{Id, Timestamp};

use super::rows::QueueEntryRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, interests, status, matched_with, \
                       game_session_id, created_at, expires_at";

/// CRUD plus the atomic group-claim for queue entries.
pub struct QueueRepo;

impl QueueRepo {
    /// Insert a new entry with status `waiting`, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewQueueEntry) -> Result<QueueEntryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO matchmaking_queue (user_id, interests, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueEntryRow>(&query)
            .bind(&input.user_id)
            .bind(Json(&input.interests))
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// The user's `waiting` or `matched` entry, if any.
    pub async fn find_active_by_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<QueueEntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM matchmaking_queue
             WHERE user_id = $1 AND status IN ('waiting', 'matched')"
        );
        sqlx::query_as::<_, QueueEntryRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// All `waiting` entries except the given user's, oldest first.
    pub async fn list_waiting(
        pool: &PgPool,
        exclude_user_id: &str,
    ) -> Result<Vec<QueueEntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM matchmaking_queue
             WHERE status = 'waiting' AND user_id <> $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, QueueEntryRow>(&query)
            .bind(exclude_user_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update, returning the updated row.
    pub async fn update(
        pool: &PgPool,
        id: &str,
        patch: &QueueEntryPatch,
    ) -> Result<Option<QueueEntryRow>, sqlx::Error> {
        let query = format!(
            "UPDATE matchmaking_queue SET
                 status          = COALESCE($2, status),
                 matched_with    = COALESCE($3, matched_with),
                 game_session_id = COALESCE($4, game_session_id),
                 expires_at      = COALESCE($5, expires_at)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueEntryRow>(&query)
            .bind(id)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.matched_with.as_ref().map(Json))
            .bind(patch.game_session_id.as_deref())
            .bind(patch.expires_at)
            .fetch_optional(pool)
            .await
    }

    /// Atomically transition the whole group from `waiting` to `matched`.
    ///
    /// Runs in a transaction: the conditional `status = 'waiting'` predicate
    /// is the arbitration point between concurrent pollers. If any entry in
    /// the group was already taken, the transaction rolls back and `false`
    /// is returned.
    pub async fn try_claim(
        pool: &PgPool,
        entry_ids: &[Id],
        matched_with: &[Id],
        game_session_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE matchmaking_queue
             SET status = 'matched', matched_with = $2, game_session_id = $3
             WHERE id = ANY($1) AND status = 'waiting'",
        )
        .bind(entry_ids)
        .bind(Json(matched_with))
        .bind(game_session_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() as usize == entry_ids.len() {
            tx.commit().await?;
            Ok(true)
        } else {
            tx.rollback().await?;
            Ok(false)
        }
    }

    /// Delete entries whose expiry is more than `grace` in the past.
    /// Returns the count of deleted rows.
    pub async fn delete_expired(
        pool: &PgPool,
        now: Timestamp,
        grace: Duration,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM matchmaking_queue WHERE expires_at < $1")
            .bind(now - grace)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
