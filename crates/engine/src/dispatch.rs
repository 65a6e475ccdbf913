//! Collaborator seams of the FCB engine.
//!
//! The engine never talks HTTP directly; it goes through [`NodeDispatcher`]
//! (one synchronous-looking node execution against the Node Runner) and
//! [`TraceSink`] (one trace record per step). The production implementations
//! here are thin reqwest clients; tests plug in mocks.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use protocol::{AddNodeRequest, NodeExecutionData, NodeOutputs, TaskRecord};

use crate::models::NodeSpec;
use crate::EngineError;

/// How long one dispatched step may take end to end, including the remote
/// NPU execution the runner is blocked on.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(50);
const TRACE_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Executes one node remotely and blocks until its terminal result.
///
/// Dispatch never fails at the type level: transport and HTTP errors come
/// back as a `NodeExecutionData` with `status = "failed"`, which the FCB
/// treats as a step failure.
#[async_trait]
pub trait NodeDispatcher: Send + Sync {
    async fn dispatch(&self, node: &NodeSpec, inputs: &Value) -> NodeExecutionData;
}

/// Records one trace per executed step.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn record(
        &self,
        flow_id: Uuid,
        flow_lvl: i32,
        data: &NodeExecutionData,
    ) -> Result<(), EngineError>;
}

// ---------------------------------------------------------------------------
// HttpNodeDispatcher
// ---------------------------------------------------------------------------

/// Production dispatcher: `POST {runner}/nodes/add-node` and wait for the
/// full final task record.
pub struct HttpNodeDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNodeDispatcher {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(DISPATCH_TIMEOUT).build()?;
        Ok(Self { client, base_url: base_url.into() })
    }

    fn failed(
        node: &NodeSpec,
        inputs: &Value,
        runner_id: Uuid,
        mut logs: Vec<String>,
        message: String,
    ) -> NodeExecutionData {
        error!(node = %node.name, %runner_id, "dispatch failed: {message}");
        logs.push(message.clone());
        NodeExecutionData {
            node_name: node.name.clone(),
            runner_id,
            code: node.code.clone(),
            status: "failed".to_string(),
            inputs: inputs.clone(),
            logs,
            outputs: NodeOutputs::error(message),
        }
    }
}

#[async_trait]
impl NodeDispatcher for HttpNodeDispatcher {
    async fn dispatch(&self, node: &NodeSpec, inputs: &Value) -> NodeExecutionData {
        let runner_id = Uuid::new_v4();
        let mut logs = vec![format!(
            "node '{}' dispatched with runner id {runner_id}",
            node.name
        )];

        let payload = AddNodeRequest {
            node_name: node.name.clone(),
            code: node.code.clone(),
            inputs: inputs.clone(),
            runner_id,
        };

        debug!(node = %node.name, %runner_id, "posting to node runner");
        let response = match self
            .client
            .post(format!("{}/nodes/add-node", self.base_url))
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                return Self::failed(node, inputs, runner_id, logs, format!("request failed: {e}"))
            }
        };

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Self::failed(node, inputs, runner_id, logs, format!("runner rejected dispatch: {e}"))
            }
        };

        let record: TaskRecord = match response.json().await {
            Ok(record) => record,
            Err(e) => {
                return Self::failed(node, inputs, runner_id, logs, format!("invalid runner response: {e}"))
            }
        };

        let Some(outputs) = record.outputs else {
            return Self::failed(
                node,
                inputs,
                runner_id,
                logs,
                "runner returned a record without outputs".to_string(),
            );
        };

        logs.push("node executed".to_string());
        logs.extend(record.logs);

        NodeExecutionData {
            node_name: node.name.clone(),
            runner_id,
            code: node.code.clone(),
            status: "success".to_string(),
            inputs: inputs.clone(),
            logs,
            outputs,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpTraceSink
// ---------------------------------------------------------------------------

/// Production trace sink: `POST {trace}/trace?flow_id&flow_lvl`.
pub struct HttpTraceSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTraceSink {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(TRACE_TIMEOUT).build()?;
        Ok(Self { client, base_url: base_url.into() })
    }
}

#[async_trait]
impl TraceSink for HttpTraceSink {
    async fn record(
        &self,
        flow_id: Uuid,
        flow_lvl: i32,
        data: &NodeExecutionData,
    ) -> Result<(), EngineError> {
        let url = format!(
            "{}/trace?flow_id={flow_id}&flow_lvl={flow_lvl}",
            self.base_url
        );
        self.client
            .post(url)
            .json(data)
            .send()
            .await
            .map_err(|e| EngineError::Trace(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::Trace(e.to_string()))?;
        Ok(())
    }
}
