//! Background jobs: queue seam, worker and sweep scheduler
//!
//! Delivery is at-least-once: a job stays in flight until the worker acks it,
//! so a crash mid-job can replay it.

pub mod memory;
pub mod redis;
pub mod scheduler;
pub mod worker;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Work the background worker knows how to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    NotifyLoanCreated { loan_id: i32 },
    SweepOverdue,
}

/// A job plus its delivery bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: Uuid,
    pub job: Job,
    /// Executions that already failed
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    /// Exact payload as read from the queue, needed to ack it
    #[serde(skip)]
    raw: Option<String>,
}

impl JobEnvelope {
    pub fn new(job: Job) -> Self {
        Self {
            id: Uuid::new_v4(),
            job,
            attempts: 0,
            enqueued_at: Utc::now(),
            raw: None,
        }
    }

    /// Copy scheduled for another execution after a failure
    pub fn next_attempt(&self) -> Self {
        Self {
            id: self.id,
            job: self.job.clone(),
            attempts: self.attempts + 1,
            enqueued_at: Utc::now(),
            raw: None,
        }
    }

    pub fn to_payload(&self) -> AppResult<String> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Queue(format!("Failed to encode job {}: {}", self.id, e)))
    }

    pub fn from_payload(payload: &str) -> AppResult<Self> {
        let mut envelope: Self = serde_json::from_str(payload)
            .map_err(|e| AppError::Queue(format!("Failed to decode job payload: {}", e)))?;
        envelope.raw = Some(payload.to_string());
        Ok(envelope)
    }

    pub(crate) fn raw_payload(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

/// Asynchronous job executor's queue
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append an envelope to the queue
    async fn push(&self, envelope: JobEnvelope) -> AppResult<()>;

    /// Wait up to `timeout` for the next envelope; it stays in flight until acked
    async fn dequeue(&self, timeout: Duration) -> AppResult<Option<JobEnvelope>>;

    /// Forget an in-flight envelope
    async fn ack(&self, envelope: &JobEnvelope) -> AppResult<()>;

    /// Queue a new job, fire-and-forget
    async fn enqueue(&self, job: Job) -> AppResult<Uuid> {
        let envelope = JobEnvelope::new(job);
        let id = envelope.id;
        self.push(envelope).await?;
        Ok(id)
    }

    /// Queue another attempt of a failed envelope
    async fn retry(&self, envelope: &JobEnvelope) -> AppResult<()> {
        self.push(envelope.next_attempt()).await
    }
}
