//! Operator-facing rendering of run outcomes and ledger status.

use schemashift_engine::{RunOutcome, StatusReport};

/// One-line summary of a finished run.
pub fn describe_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Applied { versions } => {
            let list: Vec<&str> = versions.iter().map(|v| v.as_str()).collect();
            format!("Applied {} migration(s): {}", versions.len(), list.join(", "))
        }
        RunOutcome::RolledBack { target, reverted } => {
            let list: Vec<&str> = reverted.iter().map(|v| v.as_str()).collect();
            if list.is_empty() {
                format!("Rolled back to version {target}")
            } else {
                format!("Rolled back to version {target}, reverted: {}", list.join(", "))
            }
        }
        RunOutcome::NoOpNeeded { current } => match current {
            Some(current) => format!("Nothing to do, database is at version {current}"),
            None => "Nothing to do, no migrations have been applied".to_string(),
        },
        RunOutcome::AlreadyLocked { held_by, locked_at } => {
            let owner = held_by.as_deref().unwrap_or("an unknown process");
            match locked_at {
                Some(at) => format!(
                    "Database is locked by {owner} since {}",
                    at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                None => format!("Database is locked by {owner}"),
            }
        }
    }
}

/// A held lock is not an error for the engine, but the operator's run did
/// not happen.
pub fn succeeded(outcome: &RunOutcome) -> bool {
    !outcome.is_already_locked()
}

pub fn render_status(status: &StatusReport) -> String {
    let mut out = match &status.current {
        Some(current) => format!("Current database version: {current}\n"),
        None => "No migrations have been applied yet.\n".to_string(),
    };
    out.push_str("Applied migrations:\n");
    if status.applied.is_empty() {
        out.push_str("No migrations applied.\n");
    }
    for row in &status.applied {
        out.push_str(&format!(
            "- {} {} ({})\n",
            row.version,
            row.description,
            row.applied_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use schemashift_core::types::{AppliedVersion, Version};

    #[test]
    fn describes_applied_versions() {
        let outcome = RunOutcome::Applied {
            versions: vec![Version::new("1"), Version::new("2")],
        };
        assert_eq!(describe_outcome(&outcome), "Applied 2 migration(s): 1, 2");
        assert!(succeeded(&outcome));
    }

    #[test]
    fn locked_outcome_fails_the_process() {
        let outcome = RunOutcome::AlreadyLocked {
            held_by: Some("ci".into()),
            locked_at: None,
        };
        assert_eq!(describe_outcome(&outcome), "Database is locked by ci");
        assert!(!succeeded(&outcome));
    }

    #[test]
    fn empty_status() {
        let status = StatusReport {
            current: None,
            applied: vec![],
        };
        assert_eq!(
            render_status(&status),
            "No migrations have been applied yet.\nApplied migrations:\nNo migrations applied.\n"
        );
    }

    #[test]
    fn status_lists_applied_versions() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let status = StatusReport {
            current: Some(Version::new("2")),
            applied: vec![
                AppliedVersion {
                    version: Version::new("1"),
                    description: "create_users".into(),
                    applied_at: at,
                },
                AppliedVersion {
                    version: Version::new("2"),
                    description: "add_email".into(),
                    applied_at: at,
                },
            ],
        };
        let rendered = render_status(&status);
        assert!(rendered.starts_with("Current database version: 2\n"));
        assert!(rendered.contains("- 1 create_users (2024-05-01 12:00:00 UTC)\n"));
        assert!(rendered.contains("- 2 add_email"));
    }
}
