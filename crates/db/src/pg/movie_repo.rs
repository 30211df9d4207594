//! Read-only repositories for the `movies` and `users` projections.

use sqlx::PgPool;

use super::rows::MovieRow;

pub struct MovieRepo;

impl MovieRepo {
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<MovieRow>, sqlx::Error> {
        sqlx::query_as::<_, MovieRow>("SELECT id, title, genre FROM movies WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

pub struct UserRepo;

impl UserRepo {
    pub async fn display_name(pool: &PgPool, user_id: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT display_name FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|(name,)| name))
    }
}
