//! Database operations for `link_health_history`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `link_health_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HealthSnapshotRow {
    pub id: i64,
    pub owner_id: Uuid,
    pub run_id: i64,
    pub total_links: i32,
    pub healthy_links: i32,
    pub broken_links: i32,
    pub avg_health_score: f64,
    pub revenue_health_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time aggregate written once per completed run.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewHealthSnapshot {
    pub total_links: i32,
    pub healthy_links: i32,
    pub broken_links: i32,
    pub avg_health_score: f64,
    pub revenue_health_score: f64,
}

/// Inserts the snapshot for a completed run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_health_snapshot(
    pool: &PgPool,
    owner_id: Uuid,
    run_id: i64,
    snapshot: NewHealthSnapshot,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO link_health_history \
             (owner_id, run_id, total_links, healthy_links, broken_links, \
              avg_health_score, revenue_health_score) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(owner_id)
    .bind(run_id)
    .bind(snapshot.total_links)
    .bind(snapshot.healthy_links)
    .bind(snapshot.broken_links)
    .bind(snapshot.avg_health_score)
    .bind(snapshot.revenue_health_score)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns an owner's most recent snapshots, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_health_history(
    pool: &PgPool,
    owner_id: Uuid,
    limit: i64,
) -> Result<Vec<HealthSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, HealthSnapshotRow>(
        "SELECT id, owner_id, run_id, total_links, healthy_links, broken_links, \
                avg_health_score, revenue_health_score, created_at \
         FROM link_health_history \
         WHERE owner_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(owner_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
