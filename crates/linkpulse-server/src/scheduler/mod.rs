//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring link-health audit job.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Registers the recurring audit job and starts the scheduler. Returns the
/// running [`JobScheduler`] handle, which must be kept alive for the
/// lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<linkpulse_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_audit_job(&scheduler, pool, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring audit job.
///
/// Runs every 5 minutes (`0 */5 * * * *`). Each firing audits every owner
/// that currently has active tracked pages, one owner at a time; owner-level
/// failures are logged and never propagated, and the next firing starts
/// fresh runs.
async fn register_audit_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<linkpulse_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 */5 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting audit sweep");
            run_audit_sweep(&pool, &config).await;
            tracing::info!("scheduler: audit sweep complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Drive one scheduled audit for every owner with active tracked pages.
async fn run_audit_sweep(pool: &PgPool, config: &linkpulse_core::AppConfig) {
    let owners = match linkpulse_db::list_owners_with_active_pages(pool).await {
        Ok(owners) => owners,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load owners with tracked pages");
            return;
        }
    };

    if owners.is_empty() {
        tracing::debug!("scheduler: no owners with active tracked pages; skipping");
        return;
    }

    tracing::info!(count = owners.len(), "scheduler: auditing owners");

    for owner_id in owners {
        match linkpulse_engine::run_audit(pool, config, owner_id, "full", "scheduler").await {
            Ok(summary) => {
                tracing::info!(
                    %owner_id,
                    run_id = summary.run_id,
                    links_audited = summary.counters.links_audited,
                    issues_found = summary.counters.issues_found,
                    "scheduler: audit run finished"
                );
            }
            Err(e) => {
                // The failed run already carries its error message; the next
                // firing starts a fresh run.
                tracing::error!(%owner_id, error = %e, "scheduler: audit run failed");
            }
        }
    }
}
