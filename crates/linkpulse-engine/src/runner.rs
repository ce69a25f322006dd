//! The audit orchestrator: drives one full audit run for an owner.
//!
//! Create → start → crawl pages sequentially → audit links in bounded
//! concurrent batches → score → derive issues → persist → complete (or fail
//! with a message). Per-page and per-link failures are absorbed; only
//! run-level steps (loading pages, persistence) fail the run.

use std::collections::HashSet;

use linkpulse_audit::{crawl_page, LinkClassification};
use linkpulse_core::AppConfig;
use sqlx::PgPool;
use uuid::Uuid;

use crate::batch::run_in_batches;
use crate::issues::derive_issues;
use crate::link_audit::{
    audit_link, pending_for_url, AuditClients, CheckUrlOptions, LinkAuditOutcome, LinkAuditRecord,
    PendingLink,
};
use crate::revenue::aggregate_revenue_health;

/// Links scoring at or above this count as healthy in history snapshots.
const HEALTHY_SCORE_FLOOR: u8 = 80;

/// What one completed run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub public_id: Uuid,
    pub counters: linkpulse_db::RunCounters,
    pub revenue_health_score: f64,
}

/// Drift report for one known link, produced by ad hoc destination checks.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DestinationCheck {
    pub url: String,
    pub has_changed: bool,
    pub change_pct: u8,
    pub similarity: f64,
}

/// Run one full audit for `owner_id`.
///
/// Individual page or link failures never fail the run; a run-level failure
/// (loading tracked pages, persistence) marks the run `failed` with a
/// message and is returned. Re-running for the same owner creates an
/// independent run and overwrites each link's latest health.
///
/// # Errors
///
/// Returns an error if the HTTP clients cannot be built, the run row cannot
/// be created/started, or a run-level step fails.
pub async fn run_audit(
    pool: &PgPool,
    config: &AppConfig,
    owner_id: Uuid,
    run_type: &str,
    trigger_source: &str,
) -> anyhow::Result<RunSummary> {
    let clients = AuditClients::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build audit clients: {e}"))?;

    let run = linkpulse_db::create_audit_run(pool, owner_id, run_type, trigger_source).await?;
    if let Err(e) = linkpulse_db::start_audit_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, &format!("{e:#}")).await;
        return Err(e.into());
    }

    tracing::info!(run_id = run.id, %owner_id, run_type, "audit run started");

    match execute_run(pool, config, &clients, owner_id, run.id).await {
        Ok(summary) => {
            tracing::info!(
                run_id = run.id,
                links_audited = summary.counters.links_audited,
                links_skipped = summary.counters.links_skipped,
                issues_found = summary.counters.issues_found,
                "audit run completed"
            );
            Ok(RunSummary {
                public_id: run.public_id,
                ..summary
            })
        }
        Err(e) => {
            fail_run_best_effort(pool, run.id, &format!("{e:#}")).await;
            Err(e)
        }
    }
}

async fn execute_run(
    pool: &PgPool,
    config: &AppConfig,
    clients: &AuditClients,
    owner_id: Uuid,
    run_id: i64,
) -> anyhow::Result<RunSummary> {
    let pages = linkpulse_db::list_tracked_pages(pool, owner_id).await?;
    let pending = collect_links(pool, clients, owner_id, &pages).await?;

    let (audited, skipped) = audit_in_batches(clients, config, pending).await;

    let mut counters = linkpulse_db::RunCounters {
        links_skipped: to_i32(skipped.len()),
        ..Default::default()
    };

    for record in &audited {
        let health = new_link_health(record, run_id);
        let health_id = linkpulse_db::upsert_link_health(pool, owner_id, &health).await?;

        for issue in derive_issues(record) {
            linkpulse_db::insert_link_issue(
                pool,
                owner_id,
                &linkpulse_db::NewLinkIssue {
                    run_id,
                    link_health_id: health_id,
                    issue_type: issue.issue_type.to_string(),
                    severity: issue.severity.as_str().to_string(),
                    revenue_impact: issue.revenue_impact,
                    confidence: i32::from(issue.confidence),
                    detail: issue.detail,
                },
            )
            .await?;

            counters.issues_found = counters.issues_found.saturating_add(1);
            match issue.severity {
                crate::issues::Severity::Critical => {
                    counters.critical_count = counters.critical_count.saturating_add(1);
                }
                crate::issues::Severity::Warning => {
                    counters.warning_count = counters.warning_count.saturating_add(1);
                }
                crate::issues::Severity::Info => {
                    counters.info_count = counters.info_count.saturating_add(1);
                }
            }
        }

        counters.links_audited = counters.links_audited.saturating_add(1);
    }

    let revenue_health_score = aggregate_revenue_health(&audited);

    linkpulse_db::complete_audit_run(pool, run_id, counters).await?;
    linkpulse_db::insert_health_snapshot(
        pool,
        owner_id,
        run_id,
        build_snapshot(&audited, revenue_health_score),
    )
    .await?;

    Ok(RunSummary {
        run_id,
        public_id: Uuid::nil(), // replaced by the caller, which holds the row
        counters,
        revenue_health_score,
    })
}

/// Crawl each tracked page sequentially and queue its auditable links.
///
/// Per-page crawl failures mark that page failed and move on. Internal links
/// are not audited; links are de-duplicated by URL across pages, first
/// occurrence winning. Each queued link is paired with its previously
/// recorded fingerprint for drift diffing.
async fn collect_links(
    pool: &PgPool,
    clients: &AuditClients,
    owner_id: Uuid,
    pages: &[linkpulse_db::TrackedPageRow],
) -> anyhow::Result<Vec<PendingLink>> {
    let mut pending = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for page in pages {
        match crawl_page(&clients.crawler, &page.url).await {
            Ok(crawl) => {
                linkpulse_db::update_page_crawl_status(
                    pool,
                    page.id,
                    "ok",
                    None,
                    crawl.page_title.as_deref(),
                )
                .await?;

                for link in crawl.links {
                    if link.classification == LinkClassification::Internal {
                        continue;
                    }
                    if !seen.insert(link.url.clone()) {
                        continue;
                    }

                    let previous = linkpulse_db::get_link_health(pool, owner_id, &link.url)
                        .await?
                        .map(|row| row.fingerprint)
                        .filter(|fp| !fp.is_empty());

                    pending.push(PendingLink {
                        link,
                        previous_fingerprint: previous,
                        expected_tag: None,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(page_url = %page.url, error = %e, "page crawl failed");
                linkpulse_db::update_page_crawl_status(
                    pool,
                    page.id,
                    "failed",
                    Some(&e.to_string()),
                    None,
                )
                .await?;
            }
        }
    }

    Ok(pending)
}

/// Audit the queued links in bounded sequential batches.
///
/// Returns the audited records plus the `(url, reason)` pairs for links that
/// were dropped from this run.
async fn audit_in_batches(
    clients: &AuditClients,
    config: &AppConfig,
    pending: Vec<PendingLink>,
) -> (Vec<LinkAuditRecord>, Vec<(String, String)>) {
    let batch_size = config.audit_batch_size.max(1);
    let max_hops = config.audit_max_redirect_hops;
    let drift_threshold = config.audit_drift_threshold;

    tracing::debug!(
        links = pending.len(),
        batch_size,
        batches = pending.len().div_ceil(batch_size),
        "auditing links in batches"
    );

    let urls: Vec<String> = pending.iter().map(|p| p.link.url.clone()).collect();

    let clients = clients.clone();
    let results = run_in_batches(pending, batch_size, move |p| {
        let clients = clients.clone();
        async move { audit_link(&clients, p, max_hops, drift_threshold).await }
    })
    .await;

    let mut audited = Vec::new();
    let mut skipped = Vec::new();

    for (result, url) in results.into_iter().zip(urls) {
        match result {
            Ok(LinkAuditOutcome::Audited(record)) => audited.push(*record),
            Ok(LinkAuditOutcome::Skipped { url, reason }) => {
                tracing::warn!(%url, reason, "link dropped from run");
                skipped.push((url, reason));
            }
            Err(join_error) => {
                tracing::error!(%url, error = %join_error, "link audit task failed");
                skipped.push((url, format!("audit task failed: {join_error}")));
            }
        }
    }

    (audited, skipped)
}

fn new_link_health(record: &LinkAuditRecord, run_id: i64) -> linkpulse_db::NewLinkHealth {
    linkpulse_db::NewLinkHealth {
        url: record.url.clone(),
        final_url: record.chain.final_url.clone(),
        health_score: i32::from(record.health_score),
        is_broken: record.is_broken(),
        is_out_of_stock: record.is_out_of_stock(),
        has_affiliate_tag: record.monetization.has_affiliate_tag,
        affiliate_network: record.monetization.network.map(str::to_owned),
        content_drifted: record.has_drifted(),
        drift_change_pct: record.drift.map_or(0, |d| i32::from(d.change_pct)),
        redirect_count: to_i32(record.chain.redirect_count()),
        redirect_chain: serde_json::to_value(&record.chain.hops)
            .unwrap_or_else(|_| serde_json::Value::Array(Vec::new())),
        fingerprint: record.fingerprint.encode(),
        last_run_id: Some(run_id),
    }
}

fn build_snapshot(
    audited: &[LinkAuditRecord],
    revenue_health_score: f64,
) -> linkpulse_db::NewHealthSnapshot {
    let total = audited.len();
    let healthy = audited
        .iter()
        .filter(|r| r.health_score >= HEALTHY_SCORE_FLOOR)
        .count();
    let broken = audited.iter().filter(|r| r.is_broken()).count();

    let avg = if total == 0 {
        0.0
    } else {
        audited
            .iter()
            .map(|r| f64::from(r.health_score))
            .sum::<f64>()
            / to_f64(total)
    };

    linkpulse_db::NewHealthSnapshot {
        total_links: to_i32(total),
        healthy_links: to_i32(healthy),
        broken_links: to_i32(broken),
        avg_health_score: avg,
        revenue_health_score,
    }
}

/// Audit a single URL without touching persistence.
///
/// Supports the ad hoc `check` entry point used by the CLI and API.
///
/// # Errors
///
/// Returns an error if the HTTP clients cannot be built or the URL is
/// skipped (unparsable).
pub async fn check_url(
    config: &AppConfig,
    url: &str,
    options: CheckUrlOptions,
) -> anyhow::Result<LinkAuditRecord> {
    let clients = AuditClients::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build audit clients: {e}"))?;

    let pending = pending_for_url(url, &options);
    match audit_link(
        &clients,
        pending,
        config.audit_max_redirect_hops,
        config.audit_drift_threshold,
    )
    .await
    {
        LinkAuditOutcome::Audited(record) => Ok(*record),
        LinkAuditOutcome::Skipped { url, reason } => {
            anyhow::bail!("cannot audit {url}: {reason}")
        }
    }
}

/// Re-fingerprint every known link for an owner and report drift against the
/// stored fingerprints. Read-only: nothing is persisted.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the owner's link
/// health records cannot be read.
pub async fn check_destinations_for(
    pool: &PgPool,
    config: &AppConfig,
    owner_id: Uuid,
) -> anyhow::Result<Vec<DestinationCheck>> {
    const MAX_DESTINATIONS: i64 = 500;

    let client = linkpulse_audit::build_detector_client(
        config.audit_request_timeout_secs,
        &config.audit_user_agent,
    )
    .map_err(|e| anyhow::anyhow!("failed to build audit client: {e}"))?;

    let rows = linkpulse_db::list_link_health(pool, owner_id, MAX_DESTINATIONS).await?;

    let mut checks = Vec::new();
    for row in rows {
        if row.fingerprint.is_empty() {
            continue;
        }

        let current = linkpulse_audit::fingerprint_destination(&client, &row.url).await;
        if current.is_empty() {
            // Cannot assess: fetch failed open.
            continue;
        }

        let diff = linkpulse_audit::compare_encoded(
            &row.fingerprint,
            &current.encode(),
            config.audit_drift_threshold,
        );
        checks.push(DestinationCheck {
            url: row.url,
            has_changed: diff.has_changed,
            change_pct: diff.change_pct,
            similarity: diff.similarity,
        });
    }

    Ok(checks)
}

/// Mark a run failed, logging rather than propagating any secondary error.
async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: &str) {
    if let Err(e) = linkpulse_db::fail_audit_run(pool, run_id, message).await {
        tracing::error!(run_id, error = %e, "failed to mark audit run as failed");
    }
}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(value: usize) -> f64 {
    value as f64
}
