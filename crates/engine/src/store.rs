//! Storage seams the orchestrator runs against.
//!
//! Both traits are implemented by one handle that owns the database
//! connection for the duration of a run. Ledger operations run inside the
//! transaction opened by [`VersionLedger::begin`] when one is open, and in
//! auto-commit mode otherwise. Lock operations never join that transaction.

use std::future::Future;

use schemashift_core::script::{MigrationScript, RollbackScript};
use schemashift_core::types::{AppliedVersion, LockRecord, Version};

/// Result of a lock acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAttempt {
    Acquired,
    /// Another run holds the lock. The record was not modified.
    AlreadyLocked(LockRecord),
}

/// The persistent singleton lock guarding orchestration runs.
pub trait ExclusionLock: Send {
    type LockError: std::error::Error + Send + Sync + 'static;

    /// Read the lock record. A missing record reads as unlocked.
    fn inspect(&mut self) -> impl Future<Output = Result<LockRecord, Self::LockError>> + Send;

    /// Atomically check the lock and take it for `owner`.
    ///
    /// The check and the write commit together in their own transaction, so
    /// of two concurrent callers exactly one sees [`LockAttempt::Acquired`].
    fn try_acquire(
        &mut self,
        owner: &str,
    ) -> impl Future<Output = Result<LockAttempt, Self::LockError>> + Send;

    /// Clear the lock unconditionally.
    ///
    /// Returns `false` when the lock was not held; that is not an error.
    fn release(&mut self) -> impl Future<Output = Result<bool, Self::LockError>> + Send;
}

/// The persistent record of applied versions plus the run transaction.
pub trait VersionLedger: Send {
    type LedgerError: std::error::Error + Send + Sync + 'static;

    /// Open the run transaction and leave auto-commit mode.
    fn begin(&mut self) -> impl Future<Output = Result<(), Self::LedgerError>> + Send;

    /// Commit the run transaction. Auto-commit is restored even when the
    /// commit itself fails.
    fn commit(&mut self) -> impl Future<Output = Result<(), Self::LedgerError>> + Send;

    /// Roll back the run transaction, if one is open, and restore
    /// auto-commit.
    fn abort(&mut self) -> impl Future<Output = Result<(), Self::LedgerError>> + Send;

    /// Highest applied version by string order, `None` for an empty ledger.
    fn current_version(
        &mut self,
    ) -> impl Future<Output = Result<Option<Version>, Self::LedgerError>> + Send;

    /// Applied versions, ascending.
    fn applied_versions(
        &mut self,
    ) -> impl Future<Output = Result<Vec<AppliedVersion>, Self::LedgerError>> + Send;

    /// Execute the script body and record its version. Both statements
    /// belong to the open run transaction.
    fn apply_migration(
        &mut self,
        script: &MigrationScript,
    ) -> impl Future<Output = Result<(), Self::LedgerError>> + Send;

    /// Execute a rollback script body. The ledger is not touched.
    fn execute_rollback(
        &mut self,
        script: &RollbackScript,
    ) -> impl Future<Output = Result<(), Self::LedgerError>> + Send;

    /// Remove every ledger row with a version greater than `target`.
    /// Returns the number of rows removed.
    fn delete_applied_above(
        &mut self,
        target: &Version,
    ) -> impl Future<Output = Result<u64, Self::LedgerError>> + Send;
}
