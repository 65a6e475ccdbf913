//! Trace recorder HTTP surface.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use db::models::TraceRow;
use db::DbPool;
use protocol::NodeExecutionData;

#[derive(Clone)]
pub struct TraceState {
    pub pool: DbPool,
}

pub fn router(state: TraceState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/trace", post(save_trace))
        .route("/trace/:id", get(get_by_runner).delete(delete_trace))
        .route("/flow/:flow_id", get(get_by_flow))
        .route("/flows", get(list_flows))
        .route("/traces", get(recent_traces))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn root() -> Json<Value> {
    Json(serde_json::json!({"message": "trace recorder running"}))
}

#[derive(Deserialize)]
struct TraceQuery {
    flow_id: Uuid,
    flow_lvl: i32,
}

#[derive(Serialize)]
struct SaveTraceResponse {
    message: String,
    trace_id: Uuid,
    flow_id: Uuid,
    flow_lvl: i32,
    current_sequence: i64,
}

/// Persist one node execution, assigning the flow's next sequence number.
async fn save_trace(
    Query(query): Query<TraceQuery>,
    State(state): State<TraceState>,
    Json(data): Json<NodeExecutionData>,
) -> Result<Json<SaveTraceResponse>, StatusCode> {
    let logs = serde_json::to_value(&data.logs).unwrap_or(Value::Null);
    let outputs = serde_json::to_value(&data.outputs).unwrap_or(Value::Null);

    match db::repository::traces::insert_trace(
        &state.pool,
        query.flow_id,
        query.flow_lvl,
        &data.node_name,
        data.runner_id,
        &data.code,
        &data.status,
        data.inputs,
        logs,
        outputs,
    )
    .await
    {
        Ok(row) => Ok(Json(SaveTraceResponse {
            message: "Trace saved successfully".to_string(),
            trace_id: row.trace_id,
            flow_id: row.flow_id,
            flow_lvl: row.flow_lvl,
            current_sequence: row.current_sequence,
        })),
        Err(e) => {
            tracing::error!(flow_id = %query.flow_id, "failed to save trace: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Serialize)]
struct RunnerTracesResponse {
    runner_id: Uuid,
    traces: Vec<TraceRow>,
}

async fn get_by_runner(
    Path(runner_id): Path<Uuid>,
    State(state): State<TraceState>,
) -> Result<Json<RunnerTracesResponse>, StatusCode> {
    match db::repository::traces::get_by_runner_id(&state.pool, runner_id).await {
        Ok(traces) if traces.is_empty() => Err(StatusCode::NOT_FOUND),
        Ok(traces) => Ok(Json(RunnerTracesResponse { runner_id, traces })),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[derive(Serialize)]
struct FlowTracesResponse {
    flow_id: Uuid,
    total_nodes: usize,
    /// Node names ascending by sequence — the real execution path.
    execution_path: Vec<String>,
    traces: Vec<TraceRow>,
}

async fn get_by_flow(
    Path(flow_id): Path<Uuid>,
    State(state): State<TraceState>,
) -> Result<Json<FlowTracesResponse>, StatusCode> {
    match db::repository::traces::get_by_flow_id(&state.pool, flow_id).await {
        Ok(traces) if traces.is_empty() => Err(StatusCode::NOT_FOUND),
        Ok(traces) => {
            let execution_path = traces.iter().map(|t| t.node_name.clone()).collect();
            Ok(Json(FlowTracesResponse {
                flow_id,
                total_nodes: traces.len(),
                execution_path,
                traces,
            }))
        }
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[derive(Serialize)]
struct FlowsResponse {
    total_flows: usize,
    flows: Vec<db::models::FlowSequenceRow>,
}

async fn list_flows(State(state): State<TraceState>) -> Result<Json<FlowsResponse>, StatusCode> {
    match db::repository::traces::list_flow_sequences(&state.pool).await {
        Ok(flows) => Ok(Json(FlowsResponse { total_flows: flows.len(), flows })),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[derive(Deserialize)]
struct RecentQuery {
    limit: Option<i64>,
}

#[derive(Serialize)]
struct RecentResponse {
    count: usize,
    traces: Vec<TraceRow>,
}

async fn recent_traces(
    Query(query): Query<RecentQuery>,
    State(state): State<TraceState>,
) -> Result<Json<RecentResponse>, StatusCode> {
    let limit = query.limit.unwrap_or(20).clamp(1, 500);
    match db::repository::traces::get_recent(&state.pool, limit).await {
        Ok(traces) => Ok(Json(RecentResponse { count: traces.len(), traces })),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn delete_trace(
    Path(trace_id): Path<Uuid>,
    State(state): State<TraceState>,
) -> Result<Json<Value>, StatusCode> {
    match db::repository::traces::delete_trace(&state.pool, trace_id).await {
        Ok(()) => Ok(Json(serde_json::json!({"message": "Trace deleted successfully"}))),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
