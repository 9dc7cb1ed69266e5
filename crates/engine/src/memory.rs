//! In-memory storage for orchestrator tests.
//!
//! Several [`MemoryTarget`]s can share one [`MemoryDb`] to stand in for
//! independent processes against the same database. A script body
//! containing `FAIL` errors when executed.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use schemashift_core::script::{MigrationScript, RollbackScript};
use schemashift_core::types::{AppliedVersion, LockRecord, Version};
use tokio::sync::oneshot;

use crate::store::{ExclusionLock, LockAttempt, VersionLedger};

#[derive(Debug, Default)]
pub struct MemoryDb {
    pub ledger: BTreeMap<Version, AppliedVersion>,
    pub lock: LockRecord,
    /// Bodies of every script that executed successfully, committed or not.
    pub executed: Vec<String>,
    pub lock_unavailable: bool,
    /// `commit` discards the run's changes and fails.
    pub fail_commit: bool,
    /// `abort` discards the run's changes and then fails.
    pub fail_abort: bool,
    /// `try_acquire` loses to this owner, who takes the lock between the
    /// caller's `inspect` and its acquire.
    pub race_winner: Option<String>,
}

pub type SharedDb = Arc<Mutex<MemoryDb>>;

pub fn shared_db() -> SharedDb {
    Arc::new(Mutex::new(MemoryDb::default()))
}

pub fn seed(db: &SharedDb, versions: &[&str]) {
    let mut db = db.lock().unwrap();
    for v in versions {
        db.ledger.insert(
            Version::new(*v),
            AppliedVersion {
                version: Version::new(*v),
                description: format!("seed_{v}"),
                applied_at: chrono::Utc::now(),
            },
        );
    }
}

pub fn ledger_versions(db: &SharedDb) -> Vec<String> {
    db.lock()
        .unwrap()
        .ledger
        .keys()
        .map(ToString::to_string)
        .collect()
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MemoryError(String);

/// Pauses the first migration until the test lets it continue.
pub struct Pause {
    pub entered: oneshot::Sender<()>,
    pub resume: oneshot::Receiver<()>,
}

pub struct MemoryTarget {
    db: SharedDb,
    snapshot: Option<BTreeMap<Version, AppliedVersion>>,
    pause: Option<Pause>,
}

impl MemoryTarget {
    pub fn new(db: SharedDb) -> Self {
        Self {
            db,
            snapshot: None,
            pause: None,
        }
    }

    pub fn pause_first_apply(mut self, pause: Pause) -> Self {
        self.pause = Some(pause);
        self
    }

    fn execute(&self, body: &str) -> Result<(), MemoryError> {
        if self.snapshot.is_none() {
            return Err(MemoryError("no open transaction".into()));
        }
        if body.contains("FAIL") {
            return Err(MemoryError(format!("syntax error in {body:?}")));
        }
        self.db.lock().unwrap().executed.push(body.to_string());
        Ok(())
    }
}

impl ExclusionLock for MemoryTarget {
    type LockError = MemoryError;

    async fn inspect(&mut self) -> Result<LockRecord, MemoryError> {
        let db = self.db.lock().unwrap();
        if db.lock_unavailable {
            return Err(MemoryError("lock table unavailable".into()));
        }
        Ok(db.lock.clone())
    }

    async fn try_acquire(&mut self, owner: &str) -> Result<LockAttempt, MemoryError> {
        let mut db = self.db.lock().unwrap();
        if let Some(winner) = db.race_winner.take() {
            db.lock = LockRecord::held_by(winner, chrono::Utc::now());
        }
        if db.lock.locked {
            return Ok(LockAttempt::AlreadyLocked(db.lock.clone()));
        }
        db.lock = LockRecord::held_by(owner, chrono::Utc::now());
        Ok(LockAttempt::Acquired)
    }

    async fn release(&mut self) -> Result<bool, MemoryError> {
        let mut db = self.db.lock().unwrap();
        let was_locked = db.lock.locked;
        db.lock = LockRecord::unlocked();
        Ok(was_locked)
    }
}

impl VersionLedger for MemoryTarget {
    type LedgerError = MemoryError;

    async fn begin(&mut self) -> Result<(), MemoryError> {
        self.snapshot = Some(self.db.lock().unwrap().ledger.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), MemoryError> {
        let snapshot = self.snapshot.take();
        let mut db = self.db.lock().unwrap();
        if db.fail_commit {
            if let Some(snapshot) = snapshot {
                db.ledger = snapshot;
            }
            return Err(MemoryError("commit lost".into()));
        }
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), MemoryError> {
        let mut db = self.db.lock().unwrap();
        if let Some(snapshot) = self.snapshot.take() {
            db.ledger = snapshot;
        }
        if db.fail_abort {
            return Err(MemoryError("connection closed during rollback".into()));
        }
        Ok(())
    }

    async fn current_version(&mut self) -> Result<Option<Version>, MemoryError> {
        Ok(self.db.lock().unwrap().ledger.keys().next_back().cloned())
    }

    async fn applied_versions(&mut self) -> Result<Vec<AppliedVersion>, MemoryError> {
        Ok(self.db.lock().unwrap().ledger.values().cloned().collect())
    }

    async fn apply_migration(&mut self, script: &MigrationScript) -> Result<(), MemoryError> {
        if let Some(pause) = self.pause.take() {
            let _ = pause.entered.send(());
            let _ = pause.resume.await;
        }
        self.execute(&script.body)?;
        self.db.lock().unwrap().ledger.insert(
            script.version.clone(),
            AppliedVersion {
                version: script.version.clone(),
                description: script.description.clone(),
                applied_at: chrono::Utc::now(),
            },
        );
        Ok(())
    }

    async fn execute_rollback(&mut self, script: &RollbackScript) -> Result<(), MemoryError> {
        self.execute(&script.body)
    }

    async fn delete_applied_above(&mut self, target: &Version) -> Result<u64, MemoryError> {
        let mut db = self.db.lock().unwrap();
        let before = db.ledger.len();
        db.ledger.retain(|version, _| version <= target);
        Ok((before - db.ledger.len()) as u64)
    }
}
