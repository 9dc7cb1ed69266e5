use std::path::PathBuf;

use crate::types::Version;

/// Failure while listing or reading change-scripts.
///
/// Any of these fails the whole listing; no partial result is returned.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Failed to read script directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read script {}: {source}", path.display())]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate version {version}: {} and {}", first.display(), second.display())]
    DuplicateVersion {
        version: Version,
        first: PathBuf,
        second: PathBuf,
    },
}
