use schemashift_core::types::{AppliedVersion, Timestamp, Version};

/// How a run that did not fail ended.
///
/// Failures are reported separately as [`crate::RunError`]; nothing here
/// needs error handling from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Pending migrations were applied and committed, in this order.
    Applied { versions: Vec<Version> },

    /// Rollback scripts ran, most recent first, and the ledger now ends at
    /// `target`.
    RolledBack {
        target: Version,
        reverted: Vec<Version>,
    },

    /// Nothing to do: no pending migrations, or the rollback target is at or
    /// above the current version.
    NoOpNeeded { current: Option<Version> },

    /// Another run holds the exclusion lock. No transaction was opened.
    AlreadyLocked {
        held_by: Option<String>,
        locked_at: Option<Timestamp>,
    },
}

impl RunOutcome {
    pub fn is_already_locked(&self) -> bool {
        matches!(self, Self::AlreadyLocked { .. })
    }
}

/// Read-only view of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub current: Option<Version>,
    pub applied: Vec<AppliedVersion>,
}
