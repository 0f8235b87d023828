//! Thin HTTP composition root (spec §6, §9 "construct these explicitly in a
//! composition root"). spec.md explicitly treats the HTTP request/response
//! layer itself — CORS, rate limiting, deep textual-input validation — as an
//! external collaborator's concern; this module only wires C1-C8 into the
//! contract-level routes spec.md §6 names and lets the [`Resolver`] and
//! [`JobRegistry`] do their own structural validation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use shared::dto::common::ErrorEnvelope;
use shared::dto::resolve::{ResolveRequest, ResolveResponse};
use shared::dto::schedule::{
    ScheduleListResponse, ScheduleRecordDto, ScheduleRequest, ScheduleResponse, ScheduleUpdateRequest,
};

use crate::domain::ScheduleRecord;
use crate::error::OracleError;
use crate::registry::JobRegistry;
use crate::resolver::Resolver;

/// Everything a route handler needs, cloned per-request (every field is an
/// `Arc`), following the donor's `AppState` (`lib-web/src/server.rs`).
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub registry: Arc<JobRegistry>,
}

impl axum::extract::FromRef<AppState> for Arc<Resolver> {
    fn from_ref(state: &AppState) -> Self {
        state.resolver.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<JobRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/resolve", post(resolve_handler))
        .route(
            "/schedules",
            post(create_schedule_handler).get(list_schedules_handler),
        )
        .route(
            "/schedules/:id",
            get(get_schedule_handler)
                .patch(update_schedule_handler)
                .delete(delete_schedule_handler),
        )
        .route("/schedules/:id/run", post(run_schedule_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Every route returns `OracleError` as its error type; this is the single
/// place an `OracleError` becomes a wire `ErrorEnvelope` (spec §7 propagation
/// policy: no lower-layer error crosses a boundary unwrapped, and this is
/// the outermost boundary).
impl IntoResponse for OracleError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorEnvelope::new(self.to_string()).with_status(status.as_u16());
        (status, Json(body)).into_response()
    }
}

fn schedule_to_dto(record: ScheduleRecord) -> ScheduleRecordDto {
    ScheduleRecordDto {
        id: record.id,
        token: record.token,
        network: record.network.to_string(),
        interval: record.interval,
        enabled: record.enabled,
        created_at: record.created_at,
        last_run: record.last_run,
        next_run: record.next_run,
    }
}

async fn resolve_handler(
    State(resolver): State<Arc<Resolver>>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, OracleError> {
    let resolved = resolver
        .resolve(&req.token, &req.network, req.timestamp.as_deref())
        .await?;

    Ok(Json(ResolveResponse {
        price: resolved.price,
        source: resolved.source,
        timestamp: resolved.timestamp,
        token: resolved.token,
        network: resolved.network.to_string(),
    }))
}

async fn create_schedule_handler(
    State(registry): State<Arc<JobRegistry>>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, OracleError> {
    let interval = req.interval.unwrap_or_else(|| "manual".to_string());
    let (record, job_id) = registry
        .create(&req.token, &req.network, interval, req.enabled)
        .await?;

    let (job_id, message) = match job_id {
        Some(id) => (id, "backfill scheduled".to_string()),
        None => (
            String::new(),
            "schedule recorded; no backfill dispatched".to_string(),
        ),
    };

    Ok(Json(ScheduleResponse {
        success: true,
        job_id,
        message,
        estimated_time_ms: 0,
        scheduled_at: record.created_at,
    }))
}

async fn list_schedules_handler(State(registry): State<Arc<JobRegistry>>) -> Json<ScheduleListResponse> {
    let listing = registry.list().await;
    Json(ScheduleListResponse {
        jobs: listing.records.into_iter().map(schedule_to_dto).collect(),
        total: listing.total,
        active: listing.active,
    })
}

async fn get_schedule_handler(
    State(registry): State<Arc<JobRegistry>>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleRecordDto>, OracleError> {
    let record = registry.get(&id).await?;
    Ok(Json(schedule_to_dto(record)))
}

async fn update_schedule_handler(
    State(registry): State<Arc<JobRegistry>>,
    Path(id): Path<String>,
    Json(req): Json<ScheduleUpdateRequest>,
) -> Result<Json<ScheduleRecordDto>, OracleError> {
    let record = registry.update_enabled(&id, req.enabled).await?;
    Ok(Json(schedule_to_dto(record)))
}

async fn delete_schedule_handler(
    State(registry): State<Arc<JobRegistry>>,
    Path(id): Path<String>,
) -> Result<StatusCode, OracleError> {
    registry.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn run_schedule_handler(
    State(registry): State<Arc<JobRegistry>>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleResponse>, OracleError> {
    let job_id = registry.run_now(&id).await?;
    Ok(Json(ScheduleResponse {
        success: true,
        job_id,
        message: "backfill run enqueued".to_string(),
        estimated_time_ms: 0,
        scheduled_at: chrono::Utc::now(),
    }))
}
