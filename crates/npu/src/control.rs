//! Client for the Node Runner's NPU-facing endpoints: registration,
//! heartbeats, and the fallback result post.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use protocol::{AddNpuRequest, NodeResult, NpuMetrics};

use crate::metrics::WorkerMetrics;
use crate::NpuError;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(7);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RunnerControl {
    client: reqwest::Client,
    base_url: String,
    npu_id: Uuid,
}

impl RunnerControl {
    pub fn new(base_url: impl Into<String>, npu_id: Uuid) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base_url: base_url.into(), npu_id })
    }

    pub fn npu_id(&self) -> Uuid {
        self.npu_id
    }

    /// Register this worker with the runner pool.
    pub async fn register(&self, advertise_addr: &str) -> Result<(), NpuError> {
        let body = AddNpuRequest { id: self.npu_id, address: advertise_addr.to_string() };
        self.client
            .post(format!("{}/npu/add", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        info!(npu_id = %self.npu_id, %advertise_addr, "registered with node runner");
        Ok(())
    }

    /// One heartbeat: current metrics, which also resets the runner-side
    /// expiry timer.
    pub async fn heartbeat(&self, metrics: NpuMetrics) -> Result<(), NpuError> {
        self.client
            .post(format!("{}/npu/pool/{}", self.base_url, self.npu_id))
            .json(&metrics)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Post a terminal result on behalf of a job that died before it could
    /// report its own.
    pub async fn post_result(&self, runner_id: Uuid, result: NodeResult) -> Result<(), NpuError> {
        self.client
            .post(format!("{}/npu/result/{runner_id}", self.base_url))
            .json(&result)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Heartbeat forever. If the runner expired this worker (e.g. after a
    /// runner restart), re-register so the pool stays warm.
    pub fn spawn_heartbeat(
        self: Arc<Self>,
        metrics: Arc<WorkerMetrics>,
        advertise_addr: String,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                ticker.tick().await;
                match self.heartbeat(metrics.snapshot()).await {
                    Ok(()) => {}
                    Err(e) => {
                        warn!(npu_id = %self.npu_id, "heartbeat failed: {e}");
                        if let Err(e) = self.register(&advertise_addr).await {
                            error!(npu_id = %self.npu_id, "re-registration failed: {e}");
                        }
                    }
                }
            }
        })
    }
}
