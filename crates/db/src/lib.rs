//! Storage adapters for the suggestion pipeline.
//!
//! - [`PgRecordStore`]: PostgreSQL via `sqlx`.
//! - [`MemoryStore`]: in-process tables for tests and local runs.

use sqlx::postgres::PgPoolOptions;

pub mod memory_store;
pub mod pg_store;

pub use memory_store::{MemoryStore, StoreOp};
pub use pg_store::PgRecordStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
