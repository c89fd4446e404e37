//! Redis-backed job queue
//!
//! Jobs are pushed on `<prefix>:jobs` and atomically moved to
//! `<prefix>:processing` when a worker takes them. They are removed from the
//! processing list only once acked.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};

use super::{JobEnvelope, JobQueue};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct RedisJobQueue {
    client: Client,
    jobs_key: String,
    processing_key: String,
}

impl RedisJobQueue {
    /// Create the queue and check the server answers
    pub async fn new(url: &str, prefix: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Queue(format!("Failed to create Redis client: {}", e)))?;

        let queue = Self {
            client,
            jobs_key: format!("{}:jobs", prefix),
            processing_key: format!("{}:processing", prefix),
        };

        let mut conn = queue.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Queue(format!("Redis connection test failed: {}", e)))?;

        Ok(queue)
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Queue(format!("Failed to get Redis connection: {}", e)))
    }

    /// Put back jobs left in flight by a worker that stopped before acking.
    ///
    /// Call once at startup, before any worker runs.
    pub async fn recover_in_flight(&self) -> AppResult<usize> {
        let mut conn = self.connection().await?;
        let mut recovered = 0;

        loop {
            let moved: Option<String> = redis::cmd("RPOPLPUSH")
                .arg(&self.processing_key)
                .arg(&self.jobs_key)
                .query_async(&mut conn)
                .await
                .map_err(|e| AppError::Queue(format!("Failed to recover jobs: {}", e)))?;

            if moved.is_none() {
                break;
            }
            recovered += 1;
        }

        if recovered > 0 {
            tracing::warn!(recovered, "Requeued jobs left in flight");
        }
        Ok(recovered)
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn push(&self, envelope: JobEnvelope) -> AppResult<()> {
        let payload = envelope.to_payload()?;
        let mut conn = self.connection().await?;

        conn.lpush::<_, _, ()>(&self.jobs_key, payload)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to enqueue job {}: {}", envelope.id, e)))?;

        tracing::debug!(job_id = %envelope.id, job = ?envelope.job, "Job enqueued");
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> AppResult<Option<JobEnvelope>> {
        let mut conn = self.connection().await?;

        // A zero timeout would block forever
        let payload: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(&self.jobs_key)
            .arg(&self.processing_key)
            .arg(timeout.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to dequeue job: {}", e)))?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        match JobEnvelope::from_payload(&payload) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                tracing::error!(error = %e, payload = %payload, "Dropping undecodable job");
                conn.lrem::<_, _, ()>(&self.processing_key, 1, &payload)
                    .await
                    .map_err(|e| AppError::Queue(format!("Failed to drop job: {}", e)))?;
                Ok(None)
            }
        }
    }

    async fn ack(&self, envelope: &JobEnvelope) -> AppResult<()> {
        let payload = match envelope.raw_payload() {
            Some(raw) => raw.to_string(),
            None => envelope.to_payload()?,
        };
        let mut conn = self.connection().await?;

        conn.lrem::<_, _, ()>(&self.processing_key, 1, payload)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to ack job {}: {}", envelope.id, e)))?;
        Ok(())
    }
}
