//! Command handlers for the CLI.
//!
//! These are called from `main` after argument parsing. Handlers that need
//! the database connect from env and run migrations first; per-link problems
//! are printed and skipped rather than propagated.

use sqlx::PgPool;
use uuid::Uuid;

/// Load config and connect a migrated pool.
async fn connect() -> anyhow::Result<(linkpulse_core::AppConfig, PgPool)> {
    let config = linkpulse_core::load_app_config()?;
    let pool_config = linkpulse_db::PoolConfig::from_app_config(&config);
    let pool = linkpulse_db::connect_pool(&config.database_url, pool_config).await?;
    linkpulse_db::run_migrations(&pool).await?;
    Ok((config, pool))
}

/// Run a full audit for an owner and print the outcome.
pub(crate) async fn run_audit(owner_id: Uuid, run_type: &str) -> anyhow::Result<()> {
    let (config, pool) = connect().await?;

    let summary = linkpulse_engine::run_audit(&pool, &config, owner_id, run_type, "cli").await?;

    println!(
        "run {} completed: {} links audited, {} skipped, {} issues \
         ({} critical, {} warning, {} info), revenue health {:.1}",
        summary.public_id,
        summary.counters.links_audited,
        summary.counters.links_skipped,
        summary.counters.issues_found,
        summary.counters.critical_count,
        summary.counters.warning_count,
        summary.counters.info_count,
        summary.revenue_health_score,
    );

    Ok(())
}

/// Audit one URL and print the record as pretty JSON.
pub(crate) async fn check_url(url: &str, expected_tag: Option<String>) -> anyhow::Result<()> {
    // No database needed for an ad hoc check.
    let config = linkpulse_core::load_app_config()?;

    let record = linkpulse_engine::check_url(
        &config,
        url,
        linkpulse_engine::CheckUrlOptions {
            expected_tag,
            previous_fingerprint: None,
        },
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Re-fingerprint an owner's known links and print any drift.
pub(crate) async fn check_destinations(owner_id: Uuid) -> anyhow::Result<()> {
    let (config, pool) = connect().await?;

    let checks = linkpulse_engine::check_destinations_for(&pool, &config, owner_id).await?;

    if checks.is_empty() {
        println!("no assessable destinations for owner {owner_id}");
        return Ok(());
    }

    let drifted = checks.iter().filter(|c| c.has_changed).count();
    for check in &checks {
        if check.has_changed {
            println!("DRIFT {:>3}% {}", check.change_pct, check.url);
        } else {
            println!("ok         {}", check.url);
        }
    }
    println!("{drifted} of {} destinations drifted", checks.len());

    Ok(())
}

/// Register a tracked page.
pub(crate) async fn add_page(owner_id: Uuid, url: &str) -> anyhow::Result<()> {
    let (_config, pool) = connect().await?;

    let page = linkpulse_db::insert_tracked_page(&pool, owner_id, url).await?;
    println!("tracking page {} (id {})", page.url, page.id);

    Ok(())
}

/// List an owner's tracked pages with their last crawl status.
pub(crate) async fn list_pages(owner_id: Uuid) -> anyhow::Result<()> {
    let (_config, pool) = connect().await?;

    let pages = linkpulse_db::list_tracked_pages(&pool, owner_id).await?;
    if pages.is_empty() {
        println!("no tracked pages for owner {owner_id}");
        return Ok(());
    }

    for page in &pages {
        let status = page.last_crawl_status.as_deref().unwrap_or("never crawled");
        println!("{:<10} {}", status, page.url);
        if let Some(error) = &page.last_crawl_error {
            println!("           last error: {error}");
        }
    }

    Ok(())
}
