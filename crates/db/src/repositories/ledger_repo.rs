//! Repository for the `schema_version` ledger table.
//!
//! Versions compare under the `"C"` collation so the database orders them
//! byte-wise, the same way the rest of the tool does.

use schemashift_core::types::{AppliedVersion, Version};
use sqlx::PgConnection;

use crate::models::AppliedVersionRow;

/// Column list for `schema_version` queries.
const COLUMNS: &str = "version, description, applied_at";

/// Provides query operations for the applied-version ledger.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Highest applied version, or `None` for an empty ledger.
    pub async fn current_version(conn: &mut PgConnection) -> Result<Option<Version>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT version FROM schema_version \
             ORDER BY version COLLATE \"C\" DESC \
             LIMIT 1",
        )
        .fetch_optional(conn)
        .await?;
        Ok(row.map(|(version,)| Version::new(version)))
    }

    /// All applied versions, ascending.
    pub async fn list(conn: &mut PgConnection) -> Result<Vec<AppliedVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM schema_version \
             ORDER BY version COLLATE \"C\""
        );
        let rows = sqlx::query_as::<_, AppliedVersionRow>(&query)
            .fetch_all(conn)
            .await?;
        Ok(rows.into_iter().map(AppliedVersion::from).collect())
    }

    /// Execute a script body verbatim, as one unit.
    ///
    /// Uses the simple query protocol so a body may hold several statements.
    pub async fn execute_script(conn: &mut PgConnection, body: &str) -> Result<(), sqlx::Error> {
        sqlx::Executor::execute(conn, sqlx::raw_sql(body)).await?;
        Ok(())
    }

    /// Record a migration as applied. Does not commit.
    pub async fn record_applied(
        conn: &mut PgConnection,
        version: &Version,
        description: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO schema_version (version, description, applied_at) \
             VALUES ($1, $2, NOW())",
        )
        .bind(version.as_str())
        .bind(description)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Delete every row with a version greater than `target`. Returns the
    /// number of rows removed.
    pub async fn delete_above(conn: &mut PgConnection, target: &Version) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM schema_version WHERE version COLLATE \"C\" > $1")
            .bind(target.as_str())
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
