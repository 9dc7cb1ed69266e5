//! PostgreSQL storage for schemashift.
//!
//! Provides pool setup, the bootstrap of the two bookkeeping tables, the
//! ledger and lock repositories, and [`target::PgMigrationTarget`], which
//! implements the engine's storage seams on top of them.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod target;

pub type DbPool = sqlx::PgPool;

/// Ledger table: one row per applied migration.
const CREATE_SCHEMA_VERSION: &str = "\
    CREATE TABLE IF NOT EXISTS schema_version ( \
        version VARCHAR(50) PRIMARY KEY, \
        description VARCHAR(255) NOT NULL, \
        applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW() \
    )";

/// Singleton lock table; the check constraint pins it to one row.
const CREATE_MIGRATION_LOCK: &str = "\
    CREATE TABLE IF NOT EXISTS migration_lock ( \
        id INT PRIMARY KEY CHECK (id = 1), \
        is_locked BOOLEAN NOT NULL DEFAULT FALSE, \
        locked_at TIMESTAMPTZ, \
        locked_by VARCHAR(255) \
    )";

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Create the ledger and lock tables if they do not exist yet.
pub async fn bootstrap(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_SCHEMA_VERSION).execute(pool).await?;
    sqlx::query(CREATE_MIGRATION_LOCK).execute(pool).await?;
    tracing::debug!("Bookkeeping tables ready");
    Ok(())
}
