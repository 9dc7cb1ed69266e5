use schemashift_core::error::DiscoveryError;
use schemashift_core::report::ReportError;
use schemashift_core::types::Version;

/// Storage error from one of the seams, kept opaque to the engine.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed migrate or rollback run.
///
/// Whenever a run returns one of these after the lock was taken, the run
/// transaction has been rolled back and the lock released.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Script discovery failed: {0}")]
    ScriptDiscovery(#[from] DiscoveryError),

    #[error("Migration to version {version} failed: {source}")]
    ApplyFailed {
        version: Version,
        #[source]
        source: BoxError,
    },

    #[error("Rollback of version {version} failed: {source}")]
    RollbackFailed {
        version: Version,
        #[source]
        source: BoxError,
    },

    #[error("Lock storage failed: {0}")]
    LockStorage(#[source] BoxError),

    #[error("Transaction failed: {0}")]
    Transaction(#[source] BoxError),

    #[error("Failed to record execution report: {0}")]
    Report(#[from] ReportError),
}

impl RunError {
    pub(crate) fn lock_storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::LockStorage(Box::new(err))
    }

    pub(crate) fn transaction(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transaction(Box::new(err))
    }

    /// The script version that failed, when a single script is to blame.
    pub fn failed_version(&self) -> Option<&Version> {
        match self {
            Self::ApplyFailed { version, .. } | Self::RollbackFailed { version, .. } => {
                Some(version)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_failed_names_version_and_cause() {
        let err = RunError::ApplyFailed {
            version: Version::new("7"),
            source: "relation \"users\" already exists".into(),
        };
        assert_eq!(
            err.to_string(),
            "Migration to version 7 failed: relation \"users\" already exists"
        );
        assert_eq!(err.failed_version(), Some(&Version::new("7")));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn lock_storage_has_no_version() {
        let err = RunError::lock_storage(std::io::Error::other("connection reset"));
        assert!(err.failed_version().is_none());
        assert!(err.to_string().starts_with("Lock storage failed"));
    }
}
