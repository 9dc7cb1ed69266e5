//! PostgreSQL implementation of the engine's storage seams.

use schemashift_core::script::{MigrationScript, RollbackScript};
use schemashift_core::types::{AppliedVersion, LockRecord, Version};
use schemashift_engine::store::{ExclusionLock, LockAttempt, VersionLedger};
use sqlx::{PgPool, Postgres, Transaction};

use crate::repositories::{LedgerRepo, LockRepo};

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No run transaction is open")]
    NoTransaction,
}

/// Storage handle for one orchestration run.
///
/// Lock operations go straight to the pool and commit on their own; ledger
/// operations join the run transaction while one is open. Dropping the
/// transaction handle, which `commit` and `abort` always do, returns its
/// connection to the pool in auto-commit mode.
pub struct PgMigrationTarget {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgMigrationTarget {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    fn open_tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, TargetError> {
        self.tx.as_mut().ok_or(TargetError::NoTransaction)
    }
}

impl ExclusionLock for PgMigrationTarget {
    type LockError = sqlx::Error;

    async fn inspect(&mut self) -> Result<LockRecord, sqlx::Error> {
        LockRepo::find(&self.pool).await
    }

    async fn try_acquire(&mut self, owner: &str) -> Result<LockAttempt, sqlx::Error> {
        LockRepo::try_acquire(&self.pool, owner).await
    }

    async fn release(&mut self) -> Result<bool, sqlx::Error> {
        LockRepo::release(&self.pool).await
    }
}

impl VersionLedger for PgMigrationTarget {
    type LedgerError = TargetError;

    async fn begin(&mut self) -> Result<(), TargetError> {
        if self.tx.is_some() {
            tracing::warn!("Discarding a run transaction that was still open");
        }
        self.tx = Some(self.pool.begin().await?);
        tracing::debug!("Run transaction opened");
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), TargetError> {
        let tx = self.tx.take().ok_or(TargetError::NoTransaction)?;
        tx.commit().await?;
        tracing::debug!("Run transaction committed");
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), TargetError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            tracing::debug!("Run transaction rolled back");
        }
        Ok(())
    }

    async fn current_version(&mut self) -> Result<Option<Version>, TargetError> {
        match self.tx.as_mut() {
            Some(tx) => Ok(LedgerRepo::current_version(tx).await?),
            None => {
                let mut conn = self.pool.acquire().await?;
                Ok(LedgerRepo::current_version(&mut conn).await?)
            }
        }
    }

    async fn applied_versions(&mut self) -> Result<Vec<AppliedVersion>, TargetError> {
        match self.tx.as_mut() {
            Some(tx) => Ok(LedgerRepo::list(tx).await?),
            None => {
                let mut conn = self.pool.acquire().await?;
                Ok(LedgerRepo::list(&mut conn).await?)
            }
        }
    }

    async fn apply_migration(&mut self, script: &MigrationScript) -> Result<(), TargetError> {
        let tx = self.open_tx()?;
        LedgerRepo::execute_script(tx, &script.body).await?;
        LedgerRepo::record_applied(tx, &script.version, &script.description).await?;
        Ok(())
    }

    async fn execute_rollback(&mut self, script: &RollbackScript) -> Result<(), TargetError> {
        let tx = self.open_tx()?;
        LedgerRepo::execute_script(tx, &script.body).await?;
        Ok(())
    }

    async fn delete_applied_above(&mut self, target: &Version) -> Result<u64, TargetError> {
        let tx = self.open_tx()?;
        Ok(LedgerRepo::delete_above(tx, target).await?)
    }
}
