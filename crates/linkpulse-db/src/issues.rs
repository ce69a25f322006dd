//! Database operations for `link_issues`.
//!
//! Issues are created by the orchestrator in `open` status; resolving and
//! snoozing happen outside this core.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `link_issues` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LinkIssueRow {
    pub id: i64,
    pub owner_id: Uuid,
    pub run_id: i64,
    pub link_health_id: i64,
    pub issue_type: String,
    pub severity: String,
    pub revenue_impact: f64,
    pub confidence: i32,
    pub status: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

/// An issue derived from one link's detector outputs.
#[derive(Debug, Clone)]
pub struct NewLinkIssue {
    pub run_id: i64,
    pub link_health_id: i64,
    pub issue_type: String,
    pub severity: String,
    pub revenue_impact: f64,
    pub confidence: i32,
    pub detail: String,
}

const ISSUE_COLUMNS: &str = "id, owner_id, run_id, link_health_id, issue_type, severity, \
                             revenue_impact, confidence, status, detail, created_at";

/// Inserts a new issue in `open` status and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_link_issue(
    pool: &PgPool,
    owner_id: Uuid,
    issue: &NewLinkIssue,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO link_issues \
             (owner_id, run_id, link_health_id, issue_type, severity, \
              revenue_impact, confidence, detail) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(owner_id)
    .bind(issue.run_id)
    .bind(issue.link_health_id)
    .bind(&issue.issue_type)
    .bind(&issue.severity)
    .bind(issue.revenue_impact)
    .bind(issue.confidence)
    .bind(&issue.detail)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns all issues created by a given run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_issues_for_run(pool: &PgPool, run_id: i64) -> Result<Vec<LinkIssueRow>, DbError> {
    let rows = sqlx::query_as::<_, LinkIssueRow>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM link_issues WHERE run_id = $1 ORDER BY id"
    ))
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
