//! In-process job queue

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use super::{Job, JobEnvelope, JobQueue};
use crate::error::AppResult;

#[derive(Default)]
struct Lists {
    ready: VecDeque<JobEnvelope>,
    in_flight: HashMap<Uuid, JobEnvelope>,
}

/// Queue living in the server process. Jobs do not survive a restart.
#[derive(Default)]
pub struct MemoryJobQueue {
    lists: Mutex<Lists>,
    ready: Notify,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lists(&self) -> MutexGuard<'_, Lists> {
        self.lists.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Jobs waiting to be taken, oldest first
    pub fn pending(&self) -> Vec<Job> {
        self.lists().ready.iter().map(|e| e.job.clone()).collect()
    }

    pub fn in_flight(&self) -> usize {
        self.lists().in_flight.len()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn push(&self, envelope: JobEnvelope) -> AppResult<()> {
        self.lists().ready.push_back(envelope);
        self.ready.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> AppResult<Option<JobEnvelope>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut lists = self.lists();
                if let Some(envelope) = lists.ready.pop_front() {
                    lists.in_flight.insert(envelope.id, envelope.clone());
                    return Ok(Some(envelope));
                }
            }

            if tokio::time::timeout_at(deadline, self.ready.notified()).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn ack(&self, envelope: &JobEnvelope) -> AppResult<()> {
        self.lists().in_flight.remove(&envelope.id);
        Ok(())
    }
}
