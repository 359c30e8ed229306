//! Route handlers
//!
//! The stateless routes describe the whole system in every request. The
//! `/sessions` routes keep a ledger between calls.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use banker_service::{
    self as service, BatchResponse, DeadlockInput, DeadlockResponse, LedgerView, ProcessRecord,
    ReleaseResponse, RequestRecord, RequestResponse, ResourceRecord, SafetyResponse,
    SharedLedger, StarvationResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::AppState;

// ============================================================================
// Bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SystemBody {
    pub processes: Vec<ProcessRecord>,
    pub resources: Vec<ResourceRecord>,
}

#[derive(Debug, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub processes: Vec<ProcessRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    pub process_id: String,
    pub request: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AllocateBody {
    pub policy: String,
    #[serde(default)]
    pub processes: Vec<ProcessRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default)]
    pub requests: Vec<RequestRecord>,
    #[serde(default)]
    pub quantum: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseBody {
    #[serde(default)]
    pub processes: Vec<ProcessRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    pub process_id: String,
    pub release: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StarvationBody {
    #[serde(default)]
    pub processes: Vec<ProcessRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default)]
    pub threshold: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RetireBody {
    pub process_id: String,
    pub finish_time: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub id: Uuid,
    pub ledger: LedgerView,
}

// ============================================================================
// Stateless routes
// ============================================================================

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "sessions": state.sessions.len() }))
}

pub async fn bankers(ApiJson(body): ApiJson<SystemBody>) -> Result<Json<SafetyResponse>, ApiError> {
    Ok(Json(service::check_safety(&body.processes, &body.resources)?))
}

pub async fn request(
    ApiJson(body): ApiJson<RequestBody>,
) -> Result<Json<RequestResponse>, ApiError> {
    Ok(Json(service::simulate_request(
        &body.processes,
        &body.resources,
        &body.process_id,
        &body.request,
    )?))
}

pub async fn detect(
    ApiJson(input): ApiJson<DeadlockInput>,
) -> Result<Json<DeadlockResponse>, ApiError> {
    Ok(Json(service::detect_deadlock(&input)?))
}

pub async fn allocate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AllocateBody>,
) -> Result<Json<BatchResponse>, ApiError> {
    Ok(Json(service::allocate_batch(
        &body.policy,
        &body.processes,
        &body.resources,
        &body.requests,
        body.quantum,
        &state.config.engine,
    )?))
}

pub async fn release(
    ApiJson(body): ApiJson<ReleaseBody>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    Ok(Json(service::release(
        &body.processes,
        &body.resources,
        &body.process_id,
        &body.release,
    )?))
}

pub async fn starvation(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<StarvationBody>,
) -> Result<Json<StarvationResponse>, ApiError> {
    Ok(Json(service::check_starvation(
        &body.processes,
        &body.resources,
        body.threshold,
        &state.config.engine,
    )?))
}

// ============================================================================
// Session routes
// ============================================================================

pub async fn create_session(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SystemBody>,
) -> Result<(StatusCode, Json<SessionCreated>), ApiError> {
    let ledger = SharedLedger::from_records(&body.processes, &body.resources, state.config.engine)?;
    let view = ledger.view();
    let id = state.sessions.create(ledger)?;
    Ok((StatusCode::CREATED, Json(SessionCreated { id, ledger: view })))
}

pub async fn show_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LedgerView>, ApiError> {
    Ok(Json(state.sessions.get(id)?.view()))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.sessions.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn session_safety(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SafetyResponse>, ApiError> {
    Ok(Json(state.sessions.get(id)?.check_safety()))
}

pub async fn session_detect(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeadlockResponse>, ApiError> {
    Ok(Json(state.sessions.get(id)?.scan()))
}

pub async fn session_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<RequestBody>,
) -> Result<Json<RequestResponse>, ApiError> {
    let ledger = state.sessions.get(id)?;
    Ok(Json(ledger.simulate_request(&body.process_id, &body.request)?))
}

pub async fn session_release(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<ReleaseBody>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    let ledger = state.sessions.get(id)?;
    Ok(Json(ledger.release(&body.process_id, &body.release)?))
}

pub async fn session_allocate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<AllocateBody>,
) -> Result<Json<BatchResponse>, ApiError> {
    let ledger = state.sessions.get(id)?;
    Ok(Json(ledger.allocate_batch(&body.policy, &body.requests, body.quantum)?))
}

pub async fn session_retire(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<RetireBody>,
) -> Result<Json<Value>, ApiError> {
    let ledger = state.sessions.get(id)?;
    let released = ledger.retire(&body.process_id, body.finish_time);
    Ok(Json(match released {
        Some(released) => json!({ "success": true, "released": released }),
        None => json!({
            "success": false,
            "message": format!("Process {} not found", body.process_id)
        }),
    }))
}

pub async fn session_starvation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StarvationResponse>, ApiError> {
    Ok(Json(state.sessions.get(id)?.starvation(None)))
}
