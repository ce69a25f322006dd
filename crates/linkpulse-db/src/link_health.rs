//! Database operations for `link_health`.
//!
//! One logical record per (owner, link): upsert semantics, the latest audit
//! write is authoritative.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `link_health` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LinkHealthRow {
    pub id: i64,
    pub owner_id: Uuid,
    pub url: String,
    pub final_url: String,
    pub health_score: i32,
    pub is_broken: bool,
    pub is_out_of_stock: bool,
    pub has_affiliate_tag: bool,
    pub affiliate_network: Option<String>,
    pub content_drifted: bool,
    pub drift_change_pct: i32,
    pub redirect_count: i32,
    pub redirect_chain: serde_json::Value,
    pub fingerprint: String,
    pub last_run_id: Option<i64>,
    pub checked_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Values written for one link in one audit run.
#[derive(Debug, Clone)]
pub struct NewLinkHealth {
    pub url: String,
    pub final_url: String,
    pub health_score: i32,
    pub is_broken: bool,
    pub is_out_of_stock: bool,
    pub has_affiliate_tag: bool,
    pub affiliate_network: Option<String>,
    pub content_drifted: bool,
    pub drift_change_pct: i32,
    pub redirect_count: i32,
    pub redirect_chain: serde_json::Value,
    pub fingerprint: String,
    pub last_run_id: Option<i64>,
}

const HEALTH_COLUMNS: &str = "id, owner_id, url, final_url, health_score, is_broken, \
                              is_out_of_stock, has_affiliate_tag, affiliate_network, \
                              content_drifted, drift_change_pct, redirect_count, \
                              redirect_chain, fingerprint, last_run_id, checked_at, created_at";

/// Inserts or replaces the health record for `(owner_id, url)`.
///
/// Returns the row id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_link_health(
    pool: &PgPool,
    owner_id: Uuid,
    health: &NewLinkHealth,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO link_health \
             (owner_id, url, final_url, health_score, is_broken, is_out_of_stock, \
              has_affiliate_tag, affiliate_network, content_drifted, drift_change_pct, \
              redirect_count, redirect_chain, fingerprint, last_run_id, checked_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW()) \
         ON CONFLICT (owner_id, url) DO UPDATE SET \
             final_url         = EXCLUDED.final_url, \
             health_score      = EXCLUDED.health_score, \
             is_broken         = EXCLUDED.is_broken, \
             is_out_of_stock   = EXCLUDED.is_out_of_stock, \
             has_affiliate_tag = EXCLUDED.has_affiliate_tag, \
             affiliate_network = EXCLUDED.affiliate_network, \
             content_drifted   = EXCLUDED.content_drifted, \
             drift_change_pct  = EXCLUDED.drift_change_pct, \
             redirect_count    = EXCLUDED.redirect_count, \
             redirect_chain    = EXCLUDED.redirect_chain, \
             fingerprint       = EXCLUDED.fingerprint, \
             last_run_id       = EXCLUDED.last_run_id, \
             checked_at        = NOW() \
         RETURNING id",
    )
    .bind(owner_id)
    .bind(&health.url)
    .bind(&health.final_url)
    .bind(health.health_score)
    .bind(health.is_broken)
    .bind(health.is_out_of_stock)
    .bind(health.has_affiliate_tag)
    .bind(health.affiliate_network.as_deref())
    .bind(health.content_drifted)
    .bind(health.drift_change_pct)
    .bind(health.redirect_count)
    .bind(&health.redirect_chain)
    .bind(&health.fingerprint)
    .bind(health.last_run_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Reads the previously recorded health for `(owner_id, url)`, if any.
///
/// Used to pair each freshly-extracted link with its prior fingerprint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_link_health(
    pool: &PgPool,
    owner_id: Uuid,
    url: &str,
) -> Result<Option<LinkHealthRow>, DbError> {
    let row = sqlx::query_as::<_, LinkHealthRow>(&format!(
        "SELECT {HEALTH_COLUMNS} FROM link_health WHERE owner_id = $1 AND url = $2"
    ))
    .bind(owner_id)
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns an owner's latest link health records, most recently checked first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_link_health(
    pool: &PgPool,
    owner_id: Uuid,
    limit: i64,
) -> Result<Vec<LinkHealthRow>, DbError> {
    let rows = sqlx::query_as::<_, LinkHealthRow>(&format!(
        "SELECT {HEALTH_COLUMNS} FROM link_health \
         WHERE owner_id = $1 \
         ORDER BY checked_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(owner_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
