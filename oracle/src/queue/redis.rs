use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{BackfillJob, BackfillResult};
use crate::error::degraded;

use super::{
    backoff_secs, JobQueue, JobState, JobStatus, Lease, QueueStats, Unavailable,
    COMPLETED_RETENTION, FAILED_RETENTION, MAX_ATTEMPTS,
};

/// What's actually stored per job, under `{queue}:job:{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredJob {
    job: BackfillJob,
    state: JobState,
    progress: u8,
    attempt: u32,
    result: Option<BackfillResult>,
    error: Option<String>,
}

/// Redis-backed [`JobQueue`]: a waiting list, a delayed sorted-set scored by
/// retry-eligible-at, an active set for bookkeeping, and capped completed/
/// failed lists. Same client family as [`crate::cache::redis::RedisCache`]
/// but a distinct connection, per spec §5 ("Cache clients and Queue clients
/// are shared, thread-safe handles").
pub struct RedisJobQueue {
    manager: redis::aio::ConnectionManager,
    queue_name: String,
}

impl RedisJobQueue {
    pub async fn connect(uri: &str, queue_name: impl Into<String>) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(uri)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self {
            manager,
            queue_name: queue_name.into(),
        })
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.queue_name, suffix)
    }

    async fn load(&self, job_id: &str) -> Option<StoredJob> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(self.key(&format!("job:{job_id}"))).await.ok()?;
        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    async fn store(&self, job_id: &str, stored: &StoredJob) {
        let mut conn = self.manager.clone();
        let Ok(raw) = serde_json::to_string(stored) else {
            return;
        };
        let result: Result<(), redis::RedisError> = conn.set(self.key(&format!("job:{job_id}")), raw).await;
        if let Err(e) = result {
            degraded("queue.store", e);
        }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: BackfillJob) -> Result<String, Unavailable> {
        let job_id = Uuid::new_v4().to_string();
        let stored = StoredJob {
            job,
            state: JobState::Waiting,
            progress: 0,
            attempt: 0,
            result: None,
            error: None,
        };
        let Ok(raw) = serde_json::to_string(&stored) else {
            return Err(Unavailable);
        };

        let mut conn = self.manager.clone();
        let result: Result<(), redis::RedisError> = async {
            conn.set::<_, _, ()>(self.key(&format!("job:{job_id}")), raw).await?;
            conn.rpush::<_, _, ()>(self.key("waiting"), &job_id).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => Ok(job_id),
            Err(e) => {
                degraded("queue.enqueue", e);
                Err(Unavailable)
            }
        }
    }

    async fn status(&self, job_id: &str) -> Option<JobStatus> {
        let stored = self.load(job_id).await?;
        Some(JobStatus {
            state: stored.state,
            progress: stored.progress,
            result: stored.result,
            error: stored.error,
        })
    }

    async fn stats(&self) -> QueueStats {
        let mut conn = self.manager.clone();
        let waiting: usize = conn.llen(self.key("waiting")).await.unwrap_or(0);
        let active: usize = conn.scard(self.key("active")).await.unwrap_or(0);
        let completed: usize = conn.llen(self.key("completed")).await.unwrap_or(0);
        let failed: usize = conn.llen(self.key("failed")).await.unwrap_or(0);
        let delayed: usize = conn.zcard(self.key("delayed")).await.unwrap_or(0);
        QueueStats {
            waiting,
            active,
            completed,
            failed,
            delayed,
        }
    }

    async fn dequeue(&self) -> Option<Lease> {
        let mut conn = self.manager.clone();

        // Promote delayed jobs whose backoff window has elapsed.
        let now = Utc::now().timestamp();
        let ready: Vec<String> = conn
            .zrangebyscore(self.key("delayed"), 0, now)
            .await
            .unwrap_or_default();
        for id in ready {
            let _: Result<(), redis::RedisError> = conn.zrem(self.key("delayed"), &id).await;
            let _: Result<(), redis::RedisError> = conn.rpush(self.key("waiting"), &id).await;
        }

        let job_id: Option<String> = conn.lpop(self.key("waiting"), None).await.ok().flatten();
        let job_id = job_id?;

        let mut stored = self.load(&job_id).await?;
        stored.state = JobState::Active;
        stored.attempt += 1;
        let attempt = stored.attempt;
        let job = stored.job.clone();
        self.store(&job_id, &stored).await;

        let _: Result<(), redis::RedisError> = conn.sadd(self.key("active"), &job_id).await;

        debug!(job_id = %job_id, attempt, "leased backfill job");
        Some(Lease { job_id, job, attempt })
    }

    async fn report_progress(&self, job_id: &str, progress: u8) {
        if let Some(mut stored) = self.load(job_id).await {
            stored.progress = progress;
            self.store(job_id, &stored).await;
        }
    }

    async fn complete(&self, job_id: &str, result: BackfillResult) {
        let mut conn = self.manager.clone();
        if let Some(mut stored) = self.load(job_id).await {
            stored.state = JobState::Completed;
            stored.progress = 100;
            stored.result = Some(result);
            self.store(job_id, &stored).await;
        }
        let _: Result<(), redis::RedisError> = conn.srem(self.key("active"), job_id).await;
        let _: Result<(), redis::RedisError> = conn.lpush(self.key("completed"), job_id).await;
        let _: Result<(), redis::RedisError> =
            conn.ltrim(self.key("completed"), 0, COMPLETED_RETENTION - 1).await;
    }

    async fn fail(&self, job_id: &str, attempt: u32, error: String) {
        let mut conn = self.manager.clone();
        let _: Result<(), redis::RedisError> = conn.srem(self.key("active"), job_id).await;

        if attempt < MAX_ATTEMPTS {
            let delay = backoff_secs(attempt);
            warn!(job_id = %job_id, attempt, delay_secs = delay, error = %error, "backfill job failed, retrying");
            if let Some(mut stored) = self.load(job_id).await {
                stored.state = JobState::Delayed;
                stored.error = Some(error);
                self.store(job_id, &stored).await;
            }
            let ready_at = Utc::now().timestamp() + delay;
            let _: Result<(), redis::RedisError> =
                conn.zadd(self.key("delayed"), job_id, ready_at).await;
            return;
        }

        warn!(job_id = %job_id, attempt, error = %error, "backfill job exhausted retries, marking failed");
        if let Some(mut stored) = self.load(job_id).await {
            stored.state = JobState::Failed;
            stored.error = Some(error);
            self.store(job_id, &stored).await;
        }
        let _: Result<(), redis::RedisError> = conn.lpush(self.key("failed"), job_id).await;
        let _: Result<(), redis::RedisError> = conn.ltrim(self.key("failed"), 0, FAILED_RETENTION - 1).await;
    }
}
