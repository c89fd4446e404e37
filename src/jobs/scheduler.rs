//! Recurring overdue sweep

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{Job, JobQueue};

/// Enqueue a [`Job::SweepOverdue`] every `period`, starting one period from
/// now, until `shutdown` flips to true.
pub async fn run_sweep_schedule(
    queue: Arc<dyn JobQueue>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(period_secs = period.as_secs(), "Overdue sweep scheduled");
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                match queue.enqueue(Job::SweepOverdue).await {
                    Ok(job_id) => tracing::info!(%job_id, "Overdue sweep enqueued"),
                    Err(e) => tracing::error!(error = %e, "Failed to enqueue overdue sweep"),
                }
            }
        }
    }
}
