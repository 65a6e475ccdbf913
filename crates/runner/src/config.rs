//! Node Runner process configuration, sourced from the environment.

use std::env;

/// Settings for the node runner process.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Bind host (`HOST`, default 0.0.0.0).
    pub host: String,
    /// Bind port (`PORT`, default 8500).
    pub port: u16,
    /// Base URL of the secret manager (`SECRET_MANAGER_URL`).
    pub secret_manager_url: String,
    /// Seconds without a heartbeat before an NPU is dropped
    /// (`NPU_EXPIRY_SECS`, default 10).
    pub npu_expiry_seconds: u64,
}

impl RunnerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8500),
            secret_manager_url: env::var("SECRET_MANAGER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            npu_expiry_seconds: env::var("NPU_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
