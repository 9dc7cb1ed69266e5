//! Change-script filename convention.
//!
//! Migrations are named `{prefix}{version}{delimiter}{description}{extension}`
//! and rollbacks `{prefix}{version}{delimiter}rollback{extension}`, with the
//! defaults giving `V3__add_users.sql` and `V3__rollback.sql`.

use crate::types::Version;

/// Default filename prefix before the version.
pub const DEFAULT_PREFIX: &str = "V";
/// Separator between version and description.
pub const DELIMITER: &str = "__";
/// Script file extension, including the dot.
pub const EXTENSION: &str = ".sql";
/// Description slot of every rollback script filename.
pub const ROLLBACK_MARKER: &str = "rollback";

/// Version and description extracted from a script filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub version: Version,
    pub description: String,
}

/// Filename convention used to discover scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention {
    prefix: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }
}

impl NamingConvention {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Parse a filename into version and description.
    ///
    /// Returns `None` when the name does not follow the convention or either
    /// part is empty. Only the first delimiter splits, so
    /// `V1__add__index.sql` has description `add__index`.
    pub fn parse(&self, file_name: &str) -> Option<ParsedName> {
        let stem = file_name
            .strip_suffix(EXTENSION)?
            .strip_prefix(self.prefix.as_str())?;
        let (version, description) = stem.split_once(DELIMITER)?;
        if version.is_empty() || description.is_empty() {
            return None;
        }
        Some(ParsedName {
            version: Version::new(version),
            description: description.to_string(),
        })
    }

    /// Parse a rollback filename, which must carry the rollback marker as
    /// its description.
    pub fn parse_rollback(&self, file_name: &str) -> Option<Version> {
        self.parse(file_name)
            .filter(|parsed| parsed.description == ROLLBACK_MARKER)
            .map(|parsed| parsed.version)
    }

    pub fn migration_file_name(&self, version: &str, description: &str) -> String {
        format!("{}{version}{DELIMITER}{description}{EXTENSION}", self.prefix)
    }

    pub fn rollback_file_name(&self, version: &str) -> String {
        self.migration_file_name(version, ROLLBACK_MARKER)
    }
}
