//! Background job scheduler.
//!
//! Registers the recurring sweep that fails jobs left `RUNNING` by a crashed
//! or restarted process.

use std::sync::Arc;
use std::time::Duration;

use styleprof_jobs::JobManager;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every ten minutes, at second zero.
const STALE_SWEEP_SCHEDULE: &str = "0 */10 * * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    manager: Arc<JobManager>,
    stale_after: Duration,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_stale_sweep(&scheduler, manager, stale_after).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_stale_sweep(
    scheduler: &JobScheduler,
    manager: Arc<JobManager>,
    stale_after: Duration,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(STALE_SWEEP_SCHEDULE, move |_uuid, _lock| {
        let manager = Arc::clone(&manager);

        Box::pin(async move {
            sweep_stale_jobs(&manager, stale_after).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Fail stale running jobs, logging rather than propagating errors.
pub async fn sweep_stale_jobs(manager: &JobManager, stale_after: Duration) {
    match manager.recover_stale_jobs(stale_after).await {
        Ok(recovered) if recovered.is_empty() => {
            tracing::debug!("scheduler: no stale jobs");
        }
        Ok(recovered) => {
            tracing::info!(count = recovered.len(), "scheduler: recovered stale jobs");
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: stale job sweep failed");
        }
    }
}
