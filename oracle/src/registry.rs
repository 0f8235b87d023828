//! Job Registry (spec §4.6): in-memory table of scheduled backfill
//! definitions keyed by `(token, network)`, uniqueness-enforced, CRUD +
//! manual-run. Guarded by a single lock (spec §5); persistence is a
//! deliberate non-goal (spec §4.6, §9 Open Question 1) — a restart loses
//! every [`ScheduleRecord`], which is accepted as documented behavior
//! rather than engineered around.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{BackfillJob, Network, ScheduleRecord, Token};
use crate::error::{OracleError, Result};
use crate::queue::JobQueue;

pub struct RegistryListing {
    pub records: Vec<ScheduleRecord>,
    pub total: usize,
    pub active: usize,
}

/// Grounded on the donor's [`ContractRegistry`]: a lock-guarded table behind
/// a thin CRUD API, rather than exposing the lock to callers.
pub struct JobRegistry {
    records: RwLock<HashMap<String, ScheduleRecord>>,
    queue: Arc<dyn JobQueue>,
}

impl JobRegistry {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            queue,
        }
    }

    /// `(token, network)` uniqueness is case-insensitive (spec §4.6, §8
    /// invariant 8). A schedule created enabled immediately dispatches an
    /// initial backfill, which is why the HTTP-layer response (spec §6)
    /// carries a `jobId` even for a brand-new schedule.
    pub async fn create(
        &self,
        token_raw: &str,
        network_raw: &str,
        interval: String,
        enabled: bool,
    ) -> Result<(ScheduleRecord, Option<String>)> {
        let token = Token::parse(token_raw).map_err(OracleError::InvalidInput)?;
        let network = Network::parse(network_raw)
            .ok_or_else(|| OracleError::InvalidInput(format!("unknown network '{network_raw}'")))?;

        let mut records = self.records.write().await;
        if let Some(existing) = records
            .values()
            .find(|r| r.token.eq_ignore_ascii_case(token.as_str()) && r.network == network)
        {
            return Err(OracleError::AlreadyExists(existing.id.clone()));
        }

        let record = ScheduleRecord {
            id: Uuid::new_v4().to_string(),
            token: token.as_str().to_string(),
            network,
            interval,
            enabled,
            created_at: Utc::now(),
            last_run: None,
            next_run: None,
        };
        records.insert(record.id.clone(), record.clone());
        drop(records);

        let job_id = if enabled {
            self.dispatch(&record).await.ok()
        } else {
            None
        };

        Ok((record, job_id))
    }

    pub async fn list(&self) -> RegistryListing {
        let records = self.records.read().await;
        let total = records.len();
        let active = records.values().filter(|r| r.enabled).count();
        let mut records: Vec<_> = records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        RegistryListing {
            records,
            total,
            active,
        }
    }

    pub async fn get(&self, id: &str) -> Result<ScheduleRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(OracleError::NotFound)
    }

    /// Enabling a previously-disabled schedule re-enqueues a backfill
    /// (spec §4.6 `update`).
    pub async fn update_enabled(&self, id: &str, enabled: bool) -> Result<ScheduleRecord> {
        let mut records = self.records.write().await;
        let record = records.get_mut(id).ok_or(OracleError::NotFound)?;
        let was_enabled = record.enabled;
        record.enabled = enabled;
        let updated = record.clone();
        drop(records);

        if enabled && !was_enabled {
            let _ = self.dispatch(&updated).await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(id).map(|_| ()).ok_or(OracleError::NotFound)
    }

    /// Manual run (spec §4.6 `runNow`): refuses a disabled schedule with
    /// `Disabled`; a `QueueUnavailable` result is surfaced as a soft failure
    /// since the schedule itself already exists (spec §4.7 Degraded mode).
    pub async fn run_now(&self, id: &str) -> Result<String> {
        let mut records = self.records.write().await;
        let record = records.get_mut(id).ok_or(OracleError::NotFound)?;
        if !record.enabled {
            return Err(OracleError::Disabled);
        }
        record.last_run = Some(Utc::now());
        let record = record.clone();
        drop(records);

        self.dispatch(&record).await
    }

    async fn dispatch(&self, record: &ScheduleRecord) -> Result<String> {
        let job = BackfillJob {
            token: record.token.clone(),
            network: record.network,
            start_date: None,
            end_date: None,
            request_id: Uuid::new_v4().to_string(),
        };
        self.queue
            .enqueue(job)
            .await
            .map_err(|_| OracleError::QueueUnavailable)
    }
}
