//! Execution reports and the sinks that persist them.
//!
//! One [`ExecutionReport`] is produced for every migration or rollback
//! attempt, right after the attempt. Reports are written outside the run's
//! database transaction: a `Success` report records that the step
//! succeeded within its run, not that the run later committed.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::types::{Timestamp, Version};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Which direction the reported step ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Migration,
    Rollback,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Migration => "migration",
            Self::Rollback => "rollback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Success,
    Failed,
}

/// Step-level outcome of one script execution. Write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub kind: ReportKind,
    pub version: Version,
    pub description: String,
    pub status: ReportStatus,
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecutionReport {
    pub fn success(kind: ReportKind, version: &Version, description: &str) -> Self {
        Self {
            kind,
            version: version.clone(),
            description: description.to_string(),
            status: ReportStatus::Success,
            timestamp: chrono::Utc::now(),
            error_message: None,
        }
    }

    pub fn failure(
        kind: ReportKind,
        version: &Version,
        description: &str,
        error: impl ToString,
    ) -> Self {
        Self {
            kind,
            version: version.clone(),
            description: description.to_string(),
            status: ReportStatus::Failed,
            timestamp: chrono::Utc::now(),
            error_message: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to write report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Destination for execution reports.
pub trait ReportSink: Send + Sync {
    /// Persist one report. Called once per script attempt.
    fn record(
        &self,
        report: &ExecutionReport,
    ) -> impl Future<Output = Result<(), ReportError>> + Send;
}

/// Writes each report as a pretty-printed JSON file.
///
/// Files are named `{kind}_{version}_{timestamp}.json` and created with
/// create-new semantics, so an existing report is never overwritten.
#[derive(Debug, Clone)]
pub struct JsonFileReportSink {
    dir: PathBuf,
}

impl JsonFileReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(report: &ExecutionReport) -> String {
        format!(
            "{}_{}_{}.json",
            report.kind.as_str(),
            report.version,
            report.timestamp.format("%Y%m%dT%H%M%S%.6fZ")
        )
    }
}

impl ReportSink for JsonFileReportSink {
    async fn record(&self, report: &ExecutionReport) -> Result<(), ReportError> {
        let path = self.dir.join(Self::file_name(report));
        let io_err = |source| ReportError::Io {
            path: path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(report)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(&json).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        tracing::debug!(path = %path.display(), "Execution report written");
        Ok(())
    }
}

/// Keeps reports in memory, in recording order.
#[derive(Debug, Clone, Default)]
pub struct MemoryReportSink {
    reports: Arc<Mutex<Vec<ExecutionReport>>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ExecutionReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for MemoryReportSink {
    async fn record(&self, report: &ExecutionReport) -> Result<(), ReportError> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
