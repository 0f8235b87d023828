use async_trait::async_trait;

use crate::domain::{BackfillJob, BackfillResult};

use super::{JobQueue, JobStatus, Lease, QueueStats, Unavailable};

/// Wired in when `QUEUE_URI` is unset. `enqueue` always reports unavailable,
/// exactly as spec §4.7's degraded mode describes; every other call is a
/// harmless no-op/miss so a worker loop polling a `NullJobQueue` simply never
/// finds work (spec §4.7 Degraded mode, §9 "scheduling to synchronous best-effort").
pub struct NullJobQueue;

#[async_trait]
impl JobQueue for NullJobQueue {
    async fn enqueue(&self, _job: BackfillJob) -> Result<String, Unavailable> {
        Err(Unavailable)
    }

    async fn status(&self, _job_id: &str) -> Option<JobStatus> {
        None
    }

    async fn stats(&self) -> QueueStats {
        QueueStats::default()
    }

    async fn dequeue(&self) -> Option<Lease> {
        None
    }

    async fn report_progress(&self, _job_id: &str, _progress: u8) {}

    async fn complete(&self, _job_id: &str, _result: BackfillResult) {}

    async fn fail(&self, _job_id: &str, _attempt: u32, _error: String) {}
}
