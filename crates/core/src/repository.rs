//! Filesystem script repository.
//!
//! Scans the migrations and rollbacks directories on every call; nothing is
//! cached between runs. Files that do not follow the [`NamingConvention`]
//! are ignored.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::DiscoveryError;
use crate::naming::NamingConvention;
use crate::script::{MigrationScript, RollbackScript};
use crate::types::Version;

/// A script file found on disk whose body has not been read yet.
#[derive(Debug)]
struct ScriptFile {
    description: String,
    path: PathBuf,
}

/// Reads migration and rollback scripts from their configured directories.
#[derive(Debug, Clone)]
pub struct ScriptRepository {
    migrations_dir: PathBuf,
    rollbacks_dir: PathBuf,
    naming: NamingConvention,
}

impl ScriptRepository {
    pub fn new(migrations_dir: impl Into<PathBuf>, rollbacks_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            rollbacks_dir: rollbacks_dir.into(),
            naming: NamingConvention::default(),
        }
    }

    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    pub fn rollbacks_dir(&self) -> &Path {
        &self.rollbacks_dir
    }

    /// All migration scripts, ascending by version.
    pub async fn list_migrations(&self) -> Result<Vec<MigrationScript>, DiscoveryError> {
        let files = scan(&self.migrations_dir, |name| {
            self.naming
                .parse(name)
                .map(|parsed| (parsed.version, parsed.description))
        })
        .await?;

        let mut scripts = Vec::with_capacity(files.len());
        for (version, file) in files {
            let body = read_body(&file.path).await?;
            scripts.push(MigrationScript {
                version,
                description: file.description,
                body,
            });
        }
        tracing::debug!(
            dir = %self.migrations_dir.display(),
            count = scripts.len(),
            "Listed migration scripts"
        );
        Ok(scripts)
    }

    /// Rollback scripts with `target < version <= current`, descending by
    /// version so the most recent change is undone first.
    ///
    /// The target's own rollback is excluded: rolling back to `2` leaves
    /// version `2` applied.
    pub async fn list_rollbacks(
        &self,
        target: &Version,
        current: &Version,
    ) -> Result<Vec<RollbackScript>, DiscoveryError> {
        let files = scan(&self.rollbacks_dir, |name| {
            self.naming
                .parse_rollback(name)
                .map(|version| (version, crate::naming::ROLLBACK_MARKER.to_string()))
        })
        .await?;

        let mut scripts = Vec::new();
        for (version, file) in files.into_iter().rev() {
            if &version <= target || &version > current {
                tracing::debug!(%version, "Excluding rollback script outside range");
                continue;
            }
            let body = read_body(&file.path).await?;
            scripts.push(RollbackScript::new(version, body));
        }
        tracing::debug!(
            dir = %self.rollbacks_dir.display(),
            %target,
            %current,
            count = scripts.len(),
            "Listed rollback scripts"
        );
        Ok(scripts)
    }
}

// ---------------------------------------------------------------------------
// Directory scanning
// ---------------------------------------------------------------------------

/// Collect matching files keyed (and therefore ordered) by version.
async fn scan<F>(dir: &Path, parse: F) -> Result<BTreeMap<Version, ScriptFile>, DiscoveryError>
where
    F: Fn(&str) -> Option<(Version, String)>,
{
    let read_dir_err = |source| DiscoveryError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_err)?;
    let mut files = BTreeMap::new();

    while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
        let path = entry.path();
        let Some((version, description)) = entry.file_name().to_str().and_then(&parse) else {
            continue;
        };

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| DiscoveryError::ReadScript {
                path: path.clone(),
                source,
            })?;
        if !metadata.is_file() {
            continue;
        }

        match files.entry(version) {
            Entry::Vacant(slot) => {
                slot.insert(ScriptFile { description, path });
            }
            Entry::Occupied(existing) => {
                return Err(DiscoveryError::DuplicateVersion {
                    version: existing.key().clone(),
                    first: existing.get().path.clone(),
                    second: path,
                });
            }
        }
    }

    Ok(files)
}

async fn read_body(path: &Path) -> Result<String, DiscoveryError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DiscoveryError::ReadScript {
            path: path.to_path_buf(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
