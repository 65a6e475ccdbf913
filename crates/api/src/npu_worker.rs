//! NPU worker HTTP surface: the job intake and the reachability probe
//! target.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use npu::{NpuError, NpuWorker};
use protocol::{RunAck, RunNodeRequest};

#[derive(Clone)]
pub struct NpuWorkerState {
    pub worker: Arc<NpuWorker>,
}

pub fn router(state: NpuWorkerState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/run-node", post(run_node))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Queue one job; the result arrives later via the runner callbacks.
async fn run_node(
    State(state): State<NpuWorkerState>,
    Json(job): Json<RunNodeRequest>,
) -> Result<(StatusCode, Json<RunAck>), StatusCode> {
    match state.worker.enqueue(job) {
        Ok(ack) => Ok((StatusCode::ACCEPTED, Json(ack))),
        Err(NpuError::QueueFull) => Err(StatusCode::SERVICE_UNAVAILABLE),
        Err(e) => {
            tracing::error!("failed to queue job: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
