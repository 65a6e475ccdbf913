//! The job queue and worker loops.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use protocol::{NodeResult, RunAck, RunNodeRequest, TaskStatus};

use crate::control::RunnerControl;
use crate::executor::JobExecutor;
use crate::metrics::WorkerMetrics;
use crate::NpuError;

/// Accepts jobs from the HTTP surface and fans them out to
/// `parallel_process` worker loops.
pub struct NpuWorker {
    queue: mpsc::Sender<RunNodeRequest>,
    metrics: Arc<WorkerMetrics>,
}

impl NpuWorker {
    /// Start the worker loops and return the intake handle.
    pub fn spawn(
        executor: Arc<dyn JobExecutor>,
        control: Arc<RunnerControl>,
        metrics: Arc<WorkerMetrics>,
        parallel_process: usize,
        queue_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<RunNodeRequest>(queue_capacity);
        let rx = Arc::new(Mutex::new(rx));

        for worker_idx in 0..parallel_process.max(1) {
            let rx = Arc::clone(&rx);
            let executor = Arc::clone(&executor);
            let control = Arc::clone(&control);
            let metrics = Arc::clone(&metrics);
            tokio::spawn(async move {
                info!(worker_idx, "job worker started");
                loop {
                    // Hold the receiver lock only while pulling one job.
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else {
                        info!(worker_idx, "job queue closed, worker exiting");
                        return;
                    };
                    metrics.job_started();
                    run_one(&*executor, &control, &metrics, job).await;
                }
            });
        }

        Self { queue: tx, metrics }
    }

    /// Queue one job. Returns the ack sent back as the `202` body.
    pub fn enqueue(&self, job: RunNodeRequest) -> Result<RunAck, NpuError> {
        match self.queue.try_send(job) {
            Ok(()) => {
                let queue_size = self.metrics.job_queued();
                Ok(RunAck { status: "queued".to_string(), queue_size })
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(runner_id = %job.runner_id, "job queue full, rejecting");
                Err(NpuError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(NpuError::QueueFull),
        }
    }

    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// Run one job and keep the dispatcher's contract: a terminal result is
/// always posted, by the child on success or by the worker on its behalf
/// when the process dies early.
async fn run_one(
    executor: &dyn JobExecutor,
    control: &RunnerControl,
    metrics: &WorkerMetrics,
    job: RunNodeRequest,
) {
    let runner_id = job.runner_id;
    match executor.execute(&job).await {
        Ok(()) => {
            metrics.job_succeeded();
        }
        Err(e) => {
            metrics.job_failed();
            error!(%runner_id, node = %job.node_name, "job failed: {e}");
            let fallback = NodeResult {
                nodes: Vec::new(),
                outputs: serde_json::Value::Object(serde_json::Map::new()),
                message: e.to_string(),
                status: TaskStatus::Error,
            };
            if let Err(post_err) = control.post_result(runner_id, fallback).await {
                error!(%runner_id, "failed to post fallback error result: {post_err}");
            }
        }
    }
}
