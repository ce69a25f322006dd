//! Database operations for `audit_runs`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `audit_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub owner_id: Uuid,
    pub run_type: String,
    pub trigger_source: String,
    pub status: String,
    pub links_audited: i32,
    pub links_skipped: i32,
    pub issues_found: i32,
    pub critical_count: i32,
    pub warning_count: i32,
    pub info_count: i32,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Final counters written when a run completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunCounters {
    pub links_audited: i32,
    pub links_skipped: i32,
    pub issues_found: i32,
    pub critical_count: i32,
    pub warning_count: i32,
    pub info_count: i32,
}

const RUN_COLUMNS: &str = "id, public_id, owner_id, run_type, trigger_source, status, \
                           links_audited, links_skipped, issues_found, \
                           critical_count, warning_count, info_count, \
                           error_message, started_at, completed_at, created_at";

/// Creates a new audit run in `pending` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or fetch fails.
pub async fn create_audit_run(
    pool: &PgPool,
    owner_id: Uuid,
    run_type: &str,
    trigger_source: &str,
) -> Result<AuditRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, AuditRunRow>(&format!(
        "INSERT INTO audit_runs (public_id, owner_id, run_type, trigger_source, status) \
         VALUES ($1, $2, $3, $4, 'pending') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(owner_id)
    .bind(run_type)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `pending`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_audit_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE audit_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "pending",
        });
    }

    Ok(())
}

/// Marks a run as `completed`, sets `completed_at = NOW()` and the counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_audit_run(
    pool: &PgPool,
    id: i64,
    counters: RunCounters,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE audit_runs \
         SET status = 'completed', completed_at = NOW(), \
             links_audited = $1, links_skipped = $2, issues_found = $3, \
             critical_count = $4, warning_count = $5, info_count = $6 \
         WHERE id = $7 AND status = 'running'",
    )
    .bind(counters.links_audited)
    .bind(counters.links_skipped)
    .bind(counters.issues_found)
    .bind(counters.critical_count)
    .bind(counters.warning_count)
    .bind(counters.info_count)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is already terminal,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_audit_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE audit_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status IN ('pending', 'running')",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "pending or running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_audit_run(pool: &PgPool, id: i64) -> Result<AuditRunRow, DbError> {
    let row = sqlx::query_as::<_, AuditRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM audit_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_audit_runs(pool: &PgPool, limit: i64) -> Result<Vec<AuditRunRow>, DbError> {
    let rows = sqlx::query_as::<_, AuditRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM audit_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
