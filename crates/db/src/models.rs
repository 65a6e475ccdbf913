//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types live in the `engine` and `protocol` crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// flow_checkpoints
// ---------------------------------------------------------------------------

/// A persisted flow checkpoint: the pointer and node map of one live flow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FlowCheckpointRow {
    pub flow_id: Uuid,
    /// Full JSON flow state (`nodes`, `curr_inp_data`, `curr_node`).
    pub state: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// traces
// ---------------------------------------------------------------------------

/// One node execution, annotated with its per-flow sequence number.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TraceRow {
    pub trace_id: Uuid,
    pub flow_id: Uuid,
    pub flow_lvl: i32,
    pub current_sequence: i64,
    pub node_name: String,
    pub runner_id: Uuid,
    pub code: String,
    pub status: String,
    pub inputs: serde_json::Value,
    pub logs: serde_json::Value,
    pub outputs: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// `(flow_id, steps recorded so far)` pairs for the flow overview endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FlowSequenceRow {
    pub flow_id: Uuid,
    pub last_sequence: i64,
}

// ---------------------------------------------------------------------------
// secrets
// ---------------------------------------------------------------------------

/// A persisted secret row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SecretRow {
    pub key: String,
    pub value: String,
}
