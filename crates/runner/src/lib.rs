//! `runner` crate — the placement and correlation layer between flow
//! executors and NPU workers.
//!
//! Holds the registry of live NPUs (heartbeat-expired), picks one per
//! dispatch, rewrites secret placeholders in node code, and turns the
//! asynchronous execute-then-call-back protocol into a synchronous-looking
//! [`TaskManager::run_node`] call.

pub mod config;
pub mod error;
pub mod manager;
pub mod npu_client;
pub mod scheduler;
pub mod secrets;
pub mod session;

pub use config::RunnerConfig;
pub use error::{RunnerError, SecretError};
pub use manager::{InflightTable, TaskManager};
pub use npu_client::NpuClient;
pub use scheduler::Scheduler;
pub use secrets::SecretResolver;
pub use session::{NpuSession, NpuStatus};
