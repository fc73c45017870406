use crate::workspace::Workspace;
use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Initialize and start the scheduler that snapshots every locale at the
/// configured UTC times
pub async fn start_scheduler(workspace: Arc<Workspace>, times: &[String]) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    for time in times {
        let cron_expr = time_to_cron(time)?;
        info!("Scheduling snapshot job for {} UTC (cron: {})", time, cron_expr);

        let workspace_clone = Arc::clone(&workspace);
        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
            let workspace = Arc::clone(&workspace_clone);

            Box::pin(async move {
                info!("Scheduled snapshot triggered");
                if let Err(e) = run_snapshot_job(&workspace) {
                    error!("Scheduled snapshot failed: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
    }

    scheduler.start().await?;
    info!("Scheduler started with {} snapshot times", times.len());

    Ok(scheduler)
}

/// Convert time string (HH:MM, UTC) to a daily cron expression
fn time_to_cron(time: &str) -> Result<String> {
    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() != 2 {
        anyhow::bail!("Invalid time format: {}. Expected HH:MM", time);
    }

    let hour: u8 = parts[0].trim().parse()?;
    let minute: u8 = parts[1].trim().parse()?;
    if hour > 23 || minute > 59 {
        anyhow::bail!("Invalid time: {}. Hours go to 23, minutes to 59", time);
    }

    // Cron format: "second minute hour day month day_of_week"
    Ok(format!("0 {} {} * * *", minute, hour))
}

/// Snapshot every locale; retention pruning happens inside the store
pub fn run_snapshot_job(workspace: &Workspace) -> Result<usize> {
    let created = workspace.create_snapshot(None)?;
    info!("Scheduled snapshot wrote {} files", created.len());
    Ok(created.len())
}
