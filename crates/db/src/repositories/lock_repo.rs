//! Repository for the singleton `migration_lock` table.

use schemashift_core::types::LockRecord;
use schemashift_engine::store::LockAttempt;
use sqlx::PgPool;

use crate::models::LockRow;

/// Column list for `migration_lock` queries.
const COLUMNS: &str = "is_locked, locked_at, locked_by";

/// Provides the lock's check-and-set, release and read operations.
pub struct LockRepo;

impl LockRepo {
    /// Read the lock row. A missing row reads as unlocked.
    pub async fn find(pool: &PgPool) -> Result<LockRecord, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM migration_lock WHERE id = 1");
        let row = sqlx::query_as::<_, LockRow>(&query)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(LockRecord::from).unwrap_or_default())
    }

    /// Check the lock and take it for `owner` in one transaction.
    ///
    /// The row is created if missing, then read `FOR UPDATE`: a concurrent
    /// acquirer blocks on the row until this transaction ends and then sees
    /// the committed state. Under the default READ COMMITTED isolation
    /// exactly one of them observes `is_locked = false`. A held lock is left
    /// untouched.
    pub async fn try_acquire(pool: &PgPool, owner: &str) -> Result<LockAttempt, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO migration_lock (id, is_locked) VALUES (1, FALSE) \
             ON CONFLICT (id) DO NOTHING",
        )
        .execute(&mut *tx)
        .await?;

        let query = format!("SELECT {COLUMNS} FROM migration_lock WHERE id = 1 FOR UPDATE");
        let row = sqlx::query_as::<_, LockRow>(&query)
            .fetch_one(&mut *tx)
            .await?;

        if row.is_locked {
            tx.rollback().await?;
            return Ok(LockAttempt::AlreadyLocked(row.into()));
        }

        sqlx::query(
            "UPDATE migration_lock \
             SET is_locked = TRUE, locked_at = NOW(), locked_by = $1 \
             WHERE id = 1",
        )
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(LockAttempt::Acquired)
    }

    /// Clear the lock fields. Returns `false` if the lock was not held.
    pub async fn release(pool: &PgPool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE migration_lock \
             SET is_locked = FALSE, locked_at = NULL, locked_by = NULL \
             WHERE id = 1 AND is_locked = TRUE",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
