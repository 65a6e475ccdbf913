//! Node Runner HTTP surface: synchronous dispatch plus the NPU-facing
//! registration, heartbeat, log, and result callbacks.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use protocol::{AddNodeRequest, AddNpuRequest, NodeResult, NpuMetrics, TaskRecord};
use runner::{NpuSession, NpuStatus, RunnerError, TaskManager};

#[derive(Clone)]
pub struct RunnerState {
    pub manager: Arc<TaskManager>,
    pub session: Arc<NpuSession>,
}

pub fn router(state: RunnerState) -> Router {
    Router::new()
        .route("/nodes/add-node", post(add_node))
        .route("/npu/add", post(add_npu))
        .route("/npu/pool/:npu_id", post(update_metrics))
        .route("/npu/all", get(all_npus))
        .route("/npu/log/:runner_id", post(add_log))
        .route("/npu/result/:runner_id", post(post_result))
        .with_state(state)
}

fn error_status(e: &RunnerError) -> StatusCode {
    match e {
        RunnerError::NoNpuAvailable => StatusCode::SERVICE_UNAVAILABLE,
        RunnerError::Npu(_) => StatusCode::BAD_GATEWAY,
        RunnerError::NonTerminalCallback => StatusCode::BAD_REQUEST,
        RunnerError::NpuAlreadyRegistered(_) => StatusCode::BAD_REQUEST,
        RunnerError::NpuNotRegistered(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ---------------------------------------------------------------------------
// Node dispatch
// ---------------------------------------------------------------------------

/// Synchronous dispatch: blocks until the NPU reports a terminal status and
/// returns the full final task record.
async fn add_node(
    State(state): State<RunnerState>,
    Json(payload): Json<AddNodeRequest>,
) -> Result<Json<TaskRecord>, StatusCode> {
    match state
        .manager
        .run_node(payload.node_name, payload.code, payload.inputs, payload.runner_id)
        .await
    {
        Ok(record) => Ok(Json(record)),
        Err(e) => {
            tracing::error!(runner_id = %payload.runner_id, "dispatch failed: {e}");
            Err(error_status(&e))
        }
    }
}

// ---------------------------------------------------------------------------
// NPU pool management
// ---------------------------------------------------------------------------

async fn add_npu(
    State(state): State<RunnerState>,
    Json(payload): Json<AddNpuRequest>,
) -> Result<Json<NpuStatus>, StatusCode> {
    match state.session.add_npu(payload.id, payload.address) {
        Ok(status) => Ok(Json(status)),
        Err(e) => {
            tracing::error!(npu_id = %payload.id, "failed to add NPU: {e}");
            Err(error_status(&e))
        }
    }
}

async fn update_metrics(
    Path(npu_id): Path<Uuid>,
    State(state): State<RunnerState>,
    Json(metrics): Json<NpuMetrics>,
) -> Result<Json<NpuStatus>, StatusCode> {
    match state.session.update_metrics(npu_id, metrics) {
        Ok(status) => Ok(Json(status)),
        Err(e) => Err(error_status(&e)),
    }
}

#[derive(Serialize)]
struct NpuListResponse {
    count: usize,
    npus: Vec<NpuStatus>,
}

async fn all_npus(State(state): State<RunnerState>) -> Json<NpuListResponse> {
    let npus = state.session.get_all_npus();
    Json(NpuListResponse { count: npus.len(), npus })
}

// ---------------------------------------------------------------------------
// Task callbacks
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LogParams {
    log: String,
}

async fn add_log(
    Path(runner_id): Path<Uuid>,
    Query(params): Query<LogParams>,
    State(state): State<RunnerState>,
) -> Result<StatusCode, StatusCode> {
    match state.manager.on_log(runner_id, params.log).await {
        Ok(()) => Ok(StatusCode::CREATED),
        Err(e) => {
            tracing::error!(%runner_id, "failed to add log: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn post_result(
    Path(runner_id): Path<Uuid>,
    State(state): State<RunnerState>,
    Json(result): Json<NodeResult>,
) -> Result<StatusCode, StatusCode> {
    match state.manager.on_result(runner_id, result).await {
        Ok(()) => Ok(StatusCode::CREATED),
        Err(e @ RunnerError::NonTerminalCallback) => {
            tracing::error!(%runner_id, "bad result callback: {e}");
            Err(StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            tracing::error!(%runner_id, "failed to process result: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
