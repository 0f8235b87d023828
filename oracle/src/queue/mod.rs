//! Job Queue (spec §4.7): durable work queue for backfill jobs. At-least-once
//! delivery, retries with exponential backoff starting at 5s, and bounded
//! completed/failed retention so the queue doesn't grow unbounded.
//!
//! Optional: when the backend is unreachable, `enqueue` returns [`Unavailable`]
//! and the [`crate::registry::JobRegistry`] treats it as a soft failure — the
//! schedule is still recorded (spec §4.7 Degraded mode).

pub mod null;
pub mod redis;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{BackfillJob, BackfillResult};

pub const MAX_ATTEMPTS: u32 = 3;
pub const INITIAL_BACKOFF_SECS: i64 = 5;
pub const COMPLETED_RETENTION: isize = 100;
pub const FAILED_RETENTION: isize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Delayed,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub progress: u8,
    pub result: Option<BackfillResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub delayed: usize,
}

/// The only error this trait surfaces: the backend was unreachable (spec
/// §7 `QueueUnavailable`).
#[derive(Debug)]
pub struct Unavailable;

/// A leased unit of work handed to the [`crate::worker::BackfillWorker`] by `dequeue`.
pub struct Lease {
    pub job_id: String,
    pub job: BackfillJob,
    pub attempt: u32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: BackfillJob) -> Result<String, Unavailable>;

    async fn status(&self, job_id: &str) -> Option<JobStatus>;

    async fn stats(&self) -> QueueStats;

    /// Pull the next eligible job: waiting, or delayed whose backoff has elapsed.
    /// `None` when there is nothing to do right now.
    async fn dequeue(&self) -> Option<Lease>;

    async fn report_progress(&self, job_id: &str, progress: u8);

    async fn complete(&self, job_id: &str, result: BackfillResult);

    /// Record a failed attempt. Re-queues with exponential backoff while
    /// `attempt < MAX_ATTEMPTS`; otherwise moves the job to the retained
    /// failed list (spec §4.7 Delivery / §7 `WorkerFailure`).
    async fn fail(&self, job_id: &str, attempt: u32, error: String);
}

/// Backoff delay, in seconds, before retrying the given attempt number
/// (1-indexed): `5, 10, 20, ...` (spec §4.7/§3 "exponential backoff starting at 5s").
pub fn backoff_secs(attempt: u32) -> i64 {
    INITIAL_BACKOFF_SECS * 2i64.pow(attempt.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_five_seconds() {
        assert_eq!(backoff_secs(1), 5);
        assert_eq!(backoff_secs(2), 10);
        assert_eq!(backoff_secs(3), 20);
    }
}
