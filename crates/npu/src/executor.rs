//! Job execution behind a trait seam.
//!
//! The production executor materialises the job in a scratch directory and
//! hands it to the configured interpreter. The child process talks to the
//! Node Runner itself (result + log callbacks); the exit status only tells
//! the worker whether that conversation can still happen.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use protocol::RunNodeRequest;

use crate::NpuError;

/// Executes one queued job to completion.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &RunNodeRequest) -> Result<(), NpuError>;
}

/// Runs the decoded node code as a child process:
///
/// ```text
/// {interpreter} <code_file> <input_file> <runner_id> <callback_base> <node_name>
/// ```
pub struct SubprocessExecutor {
    interpreter: String,
    /// Base URL the child posts its result and logs to
    /// (`{node_runner_addr}/npu`).
    callback_base: String,
}

impl SubprocessExecutor {
    pub fn new(interpreter: impl Into<String>, node_runner_addr: &str) -> Self {
        Self {
            interpreter: interpreter.into(),
            callback_base: format!("{node_runner_addr}/npu"),
        }
    }
}

#[async_trait]
impl JobExecutor for SubprocessExecutor {
    async fn execute(&self, job: &RunNodeRequest) -> Result<(), NpuError> {
        let source = protocol::decode_code(&job.code)?;

        let workspace = tempfile::tempdir()?;
        let code_path = workspace.path().join("node_code");
        let input_path = workspace.path().join("input.json");
        tokio::fs::write(&code_path, source).await?;
        tokio::fs::write(&input_path, serde_json::to_vec(&job.inputs)?).await?;

        debug!(node = %job.node_name, runner_id = %job.runner_id, "spawning job process");
        let status = Command::new(&self.interpreter)
            .arg(&code_path)
            .arg(&input_path)
            .arg(job.runner_id.to_string())
            .arg(&self.callback_base)
            .arg(&job.node_name)
            .kill_on_drop(true)
            .status()
            .await?;

        if status.success() {
            info!(node = %job.node_name, runner_id = %job.runner_id, "job process finished");
            Ok(())
        } else {
            Err(NpuError::JobFailed(format!(
                "interpreter exited with {status}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn job() -> RunNodeRequest {
        RunNodeRequest {
            runner_id: Uuid::new_v4(),
            code: protocol::encode_code("ignored"),
            inputs: json!({"a": 1}),
            node_name: "example".into(),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_is_success() {
        let executor = SubprocessExecutor::new("true", "http://127.0.0.1:8500");
        assert!(executor.execute(&job()).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_job_failure() {
        let executor = SubprocessExecutor::new("false", "http://127.0.0.1:8500");
        assert!(matches!(
            executor.execute(&job()).await,
            Err(NpuError::JobFailed(_))
        ));
    }

    #[tokio::test]
    async fn undecodable_code_blob_is_rejected_before_spawn() {
        let executor = SubprocessExecutor::new("true", "http://127.0.0.1:8500");
        let mut bad = job();
        bad.code = "!!not-base64!!".into();
        assert!(matches!(
            executor.execute(&bad).await,
            Err(NpuError::Codec(_))
        ));
    }
}
