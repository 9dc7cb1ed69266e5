//! Row structs for the bookkeeping tables.
//!
//! Rows are mapped with `FromRow` and converted into the core domain types,
//! which carry no sqlx dependency.

use schemashift_core::types::{AppliedVersion, LockRecord, Timestamp, Version};
use sqlx::FromRow;

/// A row of `schema_version`.
#[derive(Debug, Clone, FromRow)]
pub struct AppliedVersionRow {
    pub version: String,
    pub description: String,
    pub applied_at: Timestamp,
}

impl From<AppliedVersionRow> for AppliedVersion {
    fn from(row: AppliedVersionRow) -> Self {
        Self {
            version: Version::new(row.version),
            description: row.description,
            applied_at: row.applied_at,
        }
    }
}

/// The singleton row of `migration_lock`.
#[derive(Debug, Clone, FromRow)]
pub struct LockRow {
    pub is_locked: bool,
    pub locked_at: Option<Timestamp>,
    pub locked_by: Option<String>,
}

impl From<LockRow> for LockRecord {
    fn from(row: LockRow) -> Self {
        Self {
            locked: row.is_locked,
            locked_at: row.locked_at,
            locked_by: row.locked_by,
        }
    }
}
