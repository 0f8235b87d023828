//! Backfill schedule CRUD contract (spec §6: Schedule request/response/listing).

use serde::{Deserialize, Serialize};

/// `{ token, network, interval?, enabled? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub token: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// `{ success: true, jobId, message, estimatedTime, scheduledAt }`. Field
/// names are normative on the wire (spec §6), so this struct renders as
/// camelCase rather than serde's snake_case default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub success: bool,
    pub job_id: String,
    pub message: String,
    #[serde(rename = "estimatedTime")]
    pub estimated_time_ms: u64,
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
}

/// Wire rendering of a `ScheduleRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecordDto {
    pub id: String,
    pub token: String,
    pub network: String,
    pub interval: String,
    pub enabled: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<chrono::DateTime<chrono::Utc>>,
}

/// `{ jobs: [...], total, active }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleListResponse {
    pub jobs: Vec<ScheduleRecordDto>,
    pub total: usize,
    pub active: usize,
}

/// Body accepted by `PATCH /schedules/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleUpdateRequest {
    pub enabled: bool,
}
