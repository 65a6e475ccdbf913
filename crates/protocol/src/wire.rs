//! Request and response bodies for the flowgrid HTTP surfaces.
//!
//! These types are the source of truth for what crosses the wire; the
//! services keep no private copies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::status::TaskStatus;

// ---------------------------------------------------------------------------
// NodeOutputs
// ---------------------------------------------------------------------------

/// What one executed node hands back: the successors to run next, the data
/// for them, and a status/message pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutputs {
    /// Names of downstream nodes to execute after this one.
    pub nodes: Vec<String>,
    /// Output payload, fed to each successor as its input.
    pub outputs: Value,
    pub status: String,
    pub message: String,
}

impl NodeOutputs {
    /// Empty outputs carrying a transport or execution error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            outputs: Value::Object(serde_json::Map::new()),
            status: "error".to_string(),
            message: message.into(),
        }
    }

    /// Whether the node itself reported failure (`error` from the dispatch
    /// path, `ERROR` from the NPU callback).
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("error")
    }
}

// ---------------------------------------------------------------------------
// NodeExecutionData
// ---------------------------------------------------------------------------

/// The full record of one node execution.
///
/// Returned by the dispatcher to the FCB engine and posted verbatim to the
/// trace recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionData {
    pub node_name: String,
    pub runner_id: Uuid,
    /// The node's original base64 code blob (pre secret resolution).
    pub code: String,
    /// `"success"` or `"failed"` — the dispatch-level verdict.
    pub status: String,
    pub inputs: Value,
    pub logs: Vec<String>,
    pub outputs: NodeOutputs,
}

impl NodeExecutionData {
    /// A step failure: either the dispatch itself failed or the node's own
    /// outputs carry an error status.
    pub fn is_failure(&self) -> bool {
        self.status == "failed" || self.outputs.is_error()
    }
}

// ---------------------------------------------------------------------------
// TaskRecord
// ---------------------------------------------------------------------------

/// One in-flight (or just-finished) task inside the Node Runner, keyed by
/// `runner_id`. Also the response body of `POST /nodes/add-node`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub node_name: String,
    pub runner_id: Uuid,
    /// Secret-resolved base64 code, as sent to the NPU.
    pub code: String,
    pub status: TaskStatus,
    pub inputs: Value,
    pub logs: Vec<String>,
    /// Set by the terminal callback; `None` while the task is in flight.
    pub outputs: Option<NodeOutputs>,
}

// ---------------------------------------------------------------------------
// NpuMetrics
// ---------------------------------------------------------------------------

/// Advisory metrics reported by an NPU with every heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NpuMetrics {
    /// Seconds since the worker process started.
    pub uptime: f64,
    pub successful_tasks: u64,
    pub failed_tasks: u64,
    pub queued_tasks: u64,
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// `POST /nodes/add-node` — executor → runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodeRequest {
    pub node_name: String,
    pub code: String,
    pub inputs: Value,
    pub runner_id: Uuid,
}

/// `POST /run-node` — runner → NPU worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunNodeRequest {
    pub runner_id: Uuid,
    pub code: String,
    pub inputs: Value,
    pub node_name: String,
}

/// `POST /npu/add` — NPU worker self-registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNpuRequest {
    pub id: Uuid,
    pub address: String,
}

/// `POST /npu/result/{runner_id}` — terminal callback from an NPU.
///
/// `status` must be `DONE` or `ERROR`; the runner rejects anything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub nodes: Vec<String>,
    pub outputs: Value,
    pub message: String,
    pub status: TaskStatus,
}

/// `202` body returned by an NPU when it queues a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAck {
    pub status: String,
    pub queue_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_detection_covers_both_verdicts() {
        let ok = NodeExecutionData {
            node_name: "n".into(),
            runner_id: Uuid::new_v4(),
            code: String::new(),
            status: "success".into(),
            inputs: json!({}),
            logs: vec![],
            outputs: NodeOutputs {
                nodes: vec![],
                outputs: json!({}),
                status: "DONE".into(),
                message: "ok".into(),
            },
        };
        assert!(!ok.is_failure());

        let mut transport_failed = ok.clone();
        transport_failed.status = "failed".into();
        assert!(transport_failed.is_failure());

        let mut npu_error = ok;
        npu_error.outputs.status = "ERROR".into();
        assert!(npu_error.is_failure());
    }

    #[test]
    fn task_record_serializes_in_wire_shape() {
        let record = TaskRecord {
            node_name: "start".into(),
            runner_id: Uuid::new_v4(),
            code: "Zm4=".into(),
            status: TaskStatus::Done,
            inputs: json!({"a": 1}),
            logs: vec!["line".into()],
            outputs: Some(NodeOutputs {
                nodes: vec!["n1".into()],
                outputs: json!({"out": 3}),
                status: "DONE".into(),
                message: "ok".into(),
            }),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "DONE");
        assert_eq!(value["outputs"]["nodes"][0], "n1");
    }
}
