//! Flow executor HTTP surface.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use engine::{FlowState, NodeSpec};
use queue::{FcbQueue, QueueError};

#[derive(Clone)]
pub struct ExecutorState {
    pub queue: Arc<FcbQueue>,
}

pub fn router(state: ExecutorState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fcb/add", post(add_fcb))
        .route("/fcb/:flow_id/pause", post(pause_fcb))
        .route("/fcb/:flow_id/resume", post(resume_fcb))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct NodeDto {
    pub name: String,
    pub code: String,
    pub flow_lvl: i32,
}

impl From<NodeDto> for NodeSpec {
    fn from(dto: NodeDto) -> Self {
        NodeSpec { name: dto.name, code: dto.code, flow_lvl: dto.flow_lvl }
    }
}

#[derive(Deserialize)]
pub struct AddFcbRequest {
    pub nodes: HashMap<String, NodeDto>,
    pub curr_inp: Value,
    pub curr_node: NodeDto,
}

#[derive(Serialize)]
pub struct AddFcbResponse {
    pub message: String,
    pub flow_id: Uuid,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn add_fcb(
    State(state): State<ExecutorState>,
    Json(payload): Json<AddFcbRequest>,
) -> Result<Json<AddFcbResponse>, StatusCode> {
    let flow_state = FlowState {
        nodes: payload
            .nodes
            .into_iter()
            .map(|(name, dto)| (name, dto.into()))
            .collect(),
        curr_inp_data: payload.curr_inp,
        curr_node: Some(payload.curr_node.into()),
    };

    let flow_id = match state.queue.add(flow_state) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("failed to add flow control block: {e}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if let Err(e) = state.queue.start(flow_id).await {
        tracing::error!(%flow_id, "failed to start flow control block: {e}");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(Json(AddFcbResponse {
        message: "Flow control block added successfully.".to_string(),
        flow_id,
    }))
}

async fn pause_fcb(
    Path(flow_id): Path<Uuid>,
    State(state): State<ExecutorState>,
) -> Result<Json<MessageResponse>, StatusCode> {
    match state.queue.pause(flow_id).await {
        Ok(()) => Ok(Json(MessageResponse {
            message: format!("Flow control block {flow_id} paused successfully."),
        })),
        Err(QueueError::UnknownFlow(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(%flow_id, "failed to pause: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn resume_fcb(
    Path(flow_id): Path<Uuid>,
    State(state): State<ExecutorState>,
) -> Result<Json<MessageResponse>, StatusCode> {
    match state.queue.resume(flow_id).await {
        Ok(()) => Ok(Json(MessageResponse {
            message: format!("Flow control block {flow_id} resumed successfully."),
        })),
        Err(QueueError::UnknownFlow(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(%flow_id, "failed to resume: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
