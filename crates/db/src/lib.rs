//! Storage adapters for the Krossfire engagement backend.
//!
//! Two implementations of the [`krossfire_core::storage::Storage`] port:
//!
//! - [`pg::PgStorage`] — PostgreSQL via sqlx. The two atomicity-critical
//!   operations (match claim, question reservation) run inside
//!   transactions with conditional updates.
//! - [`memory::MemoryStorage`] — per-process maps behind a single mutex,
//!   used by tests and local development. The single lock keeps the
//!   atomicity contract honest under concurrent test execution.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod pg;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from the embedded `migrations/` directory.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
