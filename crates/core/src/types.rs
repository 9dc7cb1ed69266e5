use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque version token taken from a script filename.
///
/// Ordering is plain lexicographic string comparison, so `"10"` sorts
/// before `"2"`. Deployments that want numeric order must zero-pad their
/// versions (`"002"`, `"010"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One ledger row: a migration that was applied and committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedVersion {
    pub version: Version,
    pub description: String,
    pub applied_at: Timestamp,
}

/// State of the singleton exclusion lock row.
///
/// A missing row reads as [`LockRecord::unlocked`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LockRecord {
    pub locked: bool,
    pub locked_at: Option<Timestamp>,
    pub locked_by: Option<String>,
}

impl LockRecord {
    pub fn unlocked() -> Self {
        Self::default()
    }

    pub fn held_by(owner: impl Into<String>, at: Timestamp) -> Self {
        Self {
            locked: true,
            locked_at: Some(at),
            locked_by: Some(owner.into()),
        }
    }
}
