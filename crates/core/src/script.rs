//! Change-script model.
//!
//! Scripts are read fresh from disk on every run and never mutated. The
//! body is executed verbatim as one unit.

use crate::naming::ROLLBACK_MARKER;
use crate::types::Version;

/// A forward change-script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub version: Version,
    pub description: String,
    pub body: String,
}

/// The inverse of the migration with the same version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackScript {
    pub version: Version,
    pub description: String,
    pub body: String,
}

impl RollbackScript {
    pub fn new(version: Version, body: impl Into<String>) -> Self {
        Self {
            version,
            description: ROLLBACK_MARKER.to_string(),
            body: body.into(),
        }
    }
}
