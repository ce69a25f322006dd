//! Database operations for `tracked_pages`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `tracked_pages` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackedPageRow {
    pub id: i64,
    pub owner_id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub is_active: bool,
    pub last_crawl_status: Option<String>,
    pub last_crawl_error: Option<String>,
    pub last_audited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const PAGE_COLUMNS: &str = "id, owner_id, url, title, is_active, \
                            last_crawl_status, last_crawl_error, last_audited_at, created_at";

/// Returns an owner's active tracked pages, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tracked_pages(
    pool: &PgPool,
    owner_id: Uuid,
) -> Result<Vec<TrackedPageRow>, DbError> {
    let rows = sqlx::query_as::<_, TrackedPageRow>(&format!(
        "SELECT {PAGE_COLUMNS} FROM tracked_pages \
         WHERE owner_id = $1 AND is_active \
         ORDER BY created_at, id"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Distinct owners that currently have at least one active tracked page.
///
/// Drives the scheduled audit job.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_owners_with_active_pages(pool: &PgPool) -> Result<Vec<Uuid>, DbError> {
    let owners = sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT owner_id FROM tracked_pages WHERE is_active ORDER BY owner_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(owners)
}

/// Records the outcome of a crawl attempt on a page.
///
/// Sets `last_crawl_status`/`last_crawl_error` and stamps
/// `last_audited_at = NOW()`; also refreshes the stored page title when the
/// crawl recovered one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_page_crawl_status(
    pool: &PgPool,
    page_id: i64,
    status: &str,
    error: Option<&str>,
    title: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE tracked_pages \
         SET last_crawl_status = $1, last_crawl_error = $2, \
             last_audited_at = NOW(), title = COALESCE($3, title) \
         WHERE id = $4",
    )
    .bind(status)
    .bind(error)
    .bind(title)
    .bind(page_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Registers a page for auditing. Re-registering an existing (owner, url)
/// pair re-activates it rather than duplicating the row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn insert_tracked_page(
    pool: &PgPool,
    owner_id: Uuid,
    url: &str,
) -> Result<TrackedPageRow, DbError> {
    let row = sqlx::query_as::<_, TrackedPageRow>(&format!(
        "INSERT INTO tracked_pages (owner_id, url) \
         VALUES ($1, $2) \
         ON CONFLICT (owner_id, url) DO UPDATE SET is_active = TRUE \
         RETURNING {PAGE_COLUMNS}"
    ))
    .bind(owner_id)
    .bind(url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
