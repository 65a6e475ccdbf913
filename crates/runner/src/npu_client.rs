//! HTTP client for talking to NPU workers.

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use protocol::{RunAck, RunNodeRequest};

use crate::RunnerError;

const RUN_NODE_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct NpuClient {
    client: reqwest::Client,
}

impl NpuClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(RUN_NODE_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Best-effort reachability probe against the worker root. A failed
    /// probe is reported to the caller but never blocks the dispatch.
    pub async fn check_connection(&self, npu_id: Uuid, address: &str) -> bool {
        let url = format!("{address}/");
        debug!(%npu_id, %url, "checking NPU connection");
        match self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                debug!(%npu_id, "connection check ok");
                true
            }
            Ok(resp) => {
                warn!(%npu_id, status = %resp.status(), "connection check returned non-200");
                false
            }
            Err(e) => {
                warn!(%npu_id, "connection check failed: {e}");
                false
            }
        }
    }

    /// Hand one job to a worker. The worker queues it and reports back to
    /// `/npu/result/{runner_id}` when done.
    pub async fn run_node(
        &self,
        npu_id: Uuid,
        address: &str,
        request: &RunNodeRequest,
    ) -> Result<RunAck, RunnerError> {
        info!(%npu_id, node = %request.node_name, runner_id = %request.runner_id, "sending node execution request");
        let ack: RunAck = self
            .client
            .post(format!("{address}/run-node"))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(%npu_id, queue_size = ack.queue_size, "job queued on NPU");
        Ok(ack)
    }
}
