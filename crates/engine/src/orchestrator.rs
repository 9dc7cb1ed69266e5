//! Migrate / rollback state machine.
//!
//! A run moves through
//! `Idle -> LockAcquired -> Diffing -> Applying -> Committed | Aborted -> LockReleased`.
//! Once the lock is taken, everything the run does to the ledger happens in
//! one transaction: either every pending script of the run commits with its
//! ledger update, or none does. The lock is released on every path after
//! the transaction has been settled.

use schemashift_core::report::{ExecutionReport, ReportKind, ReportSink};
use schemashift_core::repository::ScriptRepository;
use schemashift_core::script::RollbackScript;
use schemashift_core::types::Version;

use crate::error::RunError;
use crate::outcome::{RunOutcome, StatusReport};
use crate::store::{ExclusionLock, LockAttempt, VersionLedger};

// ---------------------------------------------------------------------------
// Run plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Plan {
    Migrate,
    Rollback(Version),
}

impl Plan {
    fn name(&self) -> &'static str {
        match self {
            Self::Migrate => "migration",
            Self::Rollback(_) => "rollback",
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives migrate and rollback runs against one storage handle.
///
/// The handle is owned exclusively for the lifetime of the orchestrator;
/// runs are strictly sequential.
pub struct Orchestrator<T, S> {
    repository: ScriptRepository,
    target: T,
    sink: S,
    owner: String,
}

impl<T, S> Orchestrator<T, S>
where
    T: ExclusionLock + VersionLedger,
    S: ReportSink,
{
    /// `owner` is written to the lock record while a run holds it.
    pub fn new(repository: ScriptRepository, target: T, sink: S, owner: impl Into<String>) -> Self {
        Self {
            repository,
            target,
            sink,
            owner: owner.into(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Apply every migration newer than the current version, oldest first.
    pub async fn migrate(&mut self) -> Result<RunOutcome, RunError> {
        self.run(Plan::Migrate).await
    }

    /// Undo every applied version above `target`, newest first.
    pub async fn rollback(&mut self, target: &Version) -> Result<RunOutcome, RunError> {
        self.run(Plan::Rollback(target.clone())).await
    }

    /// Current version and applied versions. Takes no lock and opens no
    /// run transaction.
    pub async fn status(&mut self) -> Result<StatusReport, RunError> {
        let current = self
            .target
            .current_version()
            .await
            .map_err(RunError::transaction)?;
        let applied = self
            .target
            .applied_versions()
            .await
            .map_err(RunError::transaction)?;
        Ok(StatusReport { current, applied })
    }

    async fn run(&mut self, plan: Plan) -> Result<RunOutcome, RunError> {
        let record = self
            .target
            .inspect()
            .await
            .map_err(RunError::lock_storage)?;
        if record.locked {
            tracing::error!(
                run = plan.name(),
                locked_by = record.locked_by.as_deref().unwrap_or("unknown"),
                "Cannot start run, database is locked"
            );
            return Ok(RunOutcome::AlreadyLocked {
                held_by: record.locked_by,
                locked_at: record.locked_at,
            });
        }

        match self
            .target
            .try_acquire(&self.owner)
            .await
            .map_err(RunError::lock_storage)?
        {
            LockAttempt::Acquired => {
                tracing::debug!(owner = %self.owner, "Lock acquired");
            }
            LockAttempt::AlreadyLocked(record) => {
                tracing::error!(
                    run = plan.name(),
                    locked_by = record.locked_by.as_deref().unwrap_or("unknown"),
                    "Lost the race for the lock"
                );
                return Ok(RunOutcome::AlreadyLocked {
                    held_by: record.locked_by,
                    locked_at: record.locked_at,
                });
            }
        }

        tracing::info!(run = plan.name(), "Run starts");
        let result = self.run_locked(&plan).await;
        let settled = self.settle(&plan, result).await;

        match self.target.release().await {
            Ok(true) => tracing::debug!("Lock released"),
            Ok(false) => tracing::warn!("Lock was not held"),
            Err(e) => {
                if settled.is_ok() {
                    return Err(RunError::lock_storage(e));
                }
                tracing::error!(error = %e, "Failed to release lock after failed run");
            }
        }

        tracing::debug!(run = plan.name(), "Run ends");
        settled
    }

    async fn run_locked(&mut self, plan: &Plan) -> Result<RunOutcome, RunError> {
        self.target.begin().await.map_err(RunError::transaction)?;
        match plan {
            Plan::Migrate => self.apply_pending().await,
            Plan::Rollback(target) => self.revert_to(target).await,
        }
    }

    /// Commit on success, roll back on failure. Auto-commit is restored by
    /// the ledger either way.
    async fn settle(
        &mut self,
        plan: &Plan,
        result: Result<RunOutcome, RunError>,
    ) -> Result<RunOutcome, RunError> {
        match result {
            Ok(outcome) => {
                self.target.commit().await.map_err(RunError::transaction)?;
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!(run = plan.name(), error = %err, "Run failed, rolling back");
                if let Err(abort_err) = self.target.abort().await {
                    tracing::error!(error = %abort_err, "Failed to roll back run transaction");
                }
                Err(err)
            }
        }
    }

    async fn apply_pending(&mut self) -> Result<RunOutcome, RunError> {
        let current = self
            .target
            .current_version()
            .await
            .map_err(RunError::transaction)?;
        tracing::info!(
            current = current.as_ref().map_or("None", Version::as_str),
            "Current database version"
        );

        let pending: Vec<_> = self
            .repository
            .list_migrations()
            .await?
            .into_iter()
            .filter(|script| current.as_ref().map_or(true, |c| script.version > *c))
            .collect();

        if pending.is_empty() {
            tracing::info!("Database is up to date, no migrations to apply");
            return Ok(RunOutcome::NoOpNeeded { current });
        }

        let mut applied = Vec::with_capacity(pending.len());
        for script in pending {
            tracing::info!(version = %script.version, "Migrating to version");
            match self.target.apply_migration(&script).await {
                Ok(()) => {
                    self.sink
                        .record(&ExecutionReport::success(
                            ReportKind::Migration,
                            &script.version,
                            &script.description,
                        ))
                        .await?;
                    tracing::info!(version = %script.version, "Migration applied");
                    applied.push(script.version);
                }
                Err(e) => {
                    tracing::error!(version = %script.version, error = %e, "Migration failed");
                    record_failure(
                        &self.sink,
                        ExecutionReport::failure(
                            ReportKind::Migration,
                            &script.version,
                            &script.description,
                            &e,
                        ),
                    )
                    .await;
                    return Err(RunError::ApplyFailed {
                        version: script.version,
                        source: Box::new(e),
                    });
                }
            }
        }

        tracing::info!(count = applied.len(), "All migrations applied");
        Ok(RunOutcome::Applied { versions: applied })
    }

    async fn revert_to(&mut self, target: &Version) -> Result<RunOutcome, RunError> {
        let current = match self
            .target
            .current_version()
            .await
            .map_err(RunError::transaction)?
        {
            Some(current) if *target < current => current,
            current => {
                tracing::info!(
                    %target,
                    current = current.as_ref().map_or("None", Version::as_str),
                    "No rollback needed"
                );
                return Ok(RunOutcome::NoOpNeeded { current });
            }
        };
        tracing::info!(%current, %target, "Rolling back");

        let scripts = self.repository.list_rollbacks(target, &current).await?;
        self.warn_missing_rollbacks(target, &current, &scripts).await?;

        let mut reverted = Vec::with_capacity(scripts.len());
        for script in scripts {
            tracing::info!(version = %script.version, "Rolling back version");
            match self.target.execute_rollback(&script).await {
                Ok(()) => {
                    self.sink
                        .record(&ExecutionReport::success(
                            ReportKind::Rollback,
                            &script.version,
                            &script.description,
                        ))
                        .await?;
                    reverted.push(script.version);
                }
                Err(e) => {
                    tracing::error!(version = %script.version, error = %e, "Rollback failed");
                    record_failure(
                        &self.sink,
                        ExecutionReport::failure(
                            ReportKind::Rollback,
                            &script.version,
                            &script.description,
                            &e,
                        ),
                    )
                    .await;
                    return Err(RunError::RollbackFailed {
                        version: script.version,
                        source: Box::new(e),
                    });
                }
            }
        }

        let removed = self
            .target
            .delete_applied_above(target)
            .await
            .map_err(RunError::transaction)?;
        tracing::info!(%target, removed, "Rollback completed");

        Ok(RunOutcome::RolledBack {
            target: target.clone(),
            reverted,
        })
    }

    /// Applied versions in the rollback range that have no rollback script
    /// are skipped; their ledger rows are still removed.
    async fn warn_missing_rollbacks(
        &mut self,
        target: &Version,
        current: &Version,
        scripts: &[RollbackScript],
    ) -> Result<(), RunError> {
        let applied = self
            .target
            .applied_versions()
            .await
            .map_err(RunError::transaction)?;
        for row in applied
            .iter()
            .filter(|row| row.version > *target && row.version <= *current)
        {
            if !scripts.iter().any(|s| s.version == row.version) {
                tracing::warn!(version = %row.version, "No rollback script for applied version");
            }
        }
        Ok(())
    }
}

/// The script failure is what the caller sees; a sink error here is only
/// logged.
async fn record_failure<S: ReportSink>(sink: &S, report: ExecutionReport) {
    if let Err(e) = sink.record(&report).await {
        tracing::error!(version = %report.version, error = %e, "Failed to record failure report");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
