//! NPU worker process configuration, sourced from the environment.

use std::env;

/// Settings for one NPU worker process.
#[derive(Debug, Clone)]
pub struct NpuConfig {
    /// Bind host (`HOST`, default 0.0.0.0).
    pub host: String,
    /// Bind port (`PORT`, default 8600).
    pub port: u16,
    /// Base URL of the Node Runner (`NODE_RUNNER_ADDR`).
    pub node_runner_addr: String,
    /// URL under which the runner can reach this worker
    /// (`ADVERTISE_ADDR`, default `http://127.0.0.1:{port}`).
    pub advertise_addr: String,
    /// Interpreter used to run node code (`INTERPRETER`, default python3).
    pub interpreter: String,
    /// Number of jobs executed in parallel (`PARALLEL_PROCESS`, default 4).
    pub parallel_process: usize,
    /// Job queue capacity (`QUEUE_CAPACITY`, default 64).
    pub queue_capacity: usize,
}

impl NpuConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8600);
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            node_runner_addr: env::var("NODE_RUNNER_ADDR")
                .unwrap_or_else(|_| "http://127.0.0.1:8500".to_string()),
            advertise_addr: env::var("ADVERTISE_ADDR")
                .unwrap_or_else(|_| format!("http://127.0.0.1:{port}")),
            interpreter: env::var("INTERPRETER").unwrap_or_else(|_| "python3".to_string()),
            parallel_process: env::var("PARALLEL_PROCESS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            queue_capacity: env::var("QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
