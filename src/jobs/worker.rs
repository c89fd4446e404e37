//! Job worker: runs queued notifications and sweeps

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::{Job, JobQueue};
use crate::{
    config::JobsConfig,
    error::AppResult,
    services::{notifications::NotificationDispatcher, sweeper::OverdueSweeper},
};

/// Pause after a queue error before polling again
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

pub struct JobWorker {
    queue: Arc<dyn JobQueue>,
    notifications: NotificationDispatcher,
    sweeper: OverdueSweeper,
    max_attempts: u32,
    poll_timeout: Duration,
}

impl JobWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        notifications: NotificationDispatcher,
        sweeper: OverdueSweeper,
        config: &JobsConfig,
    ) -> Self {
        Self {
            queue,
            notifications,
            sweeper,
            max_attempts: config.max_attempts.max(1),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        }
    }

    /// Process jobs until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Job worker started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.process_next() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Job queue unavailable");
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        }
        tracing::info!("Job worker stopped");
    }

    /// Take and run at most one job. Returns whether a job was taken.
    pub async fn process_next(&self) -> AppResult<bool> {
        let Some(envelope) = self.queue.dequeue(self.poll_timeout).await? else {
            return Ok(false);
        };

        match self.execute(&envelope.job).await {
            Ok(()) => {
                tracing::debug!(job_id = %envelope.id, job = ?envelope.job, "Job done");
            }
            Err(e) if envelope.attempts + 1 < self.max_attempts => {
                tracing::warn!(
                    job_id = %envelope.id,
                    job = ?envelope.job,
                    attempt = envelope.attempts + 1,
                    error = %e,
                    "Job failed, requeueing"
                );
                self.queue.retry(&envelope).await?;
            }
            Err(e) => {
                tracing::error!(
                    job_id = %envelope.id,
                    job = ?envelope.job,
                    attempts = envelope.attempts + 1,
                    error = %e,
                    "Job failed too many times, dropping it"
                );
            }
        }

        self.queue.ack(&envelope).await?;
        Ok(true)
    }

    async fn execute(&self, job: &Job) -> AppResult<()> {
        match job {
            Job::NotifyLoanCreated { loan_id } => {
                self.notifications.notify_loan_created(*loan_id).await?;
            }
            Job::SweepOverdue => {
                let report = self.sweeper.sweep_overdue().await?;
                tracing::info!(status = %report.status, "Overdue sweep job done");
            }
        }
        Ok(())
    }
}
