//! Runner-level error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors from the secret resolution pipeline. Any of these aborts the
/// dispatch before the NPU is contacted.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to fetch secret '{key}': HTTP {status}")]
    FetchFailed { key: String, status: u16 },

    #[error("secret '{0}' not found or empty")]
    EmptyValue(String),

    #[error("secret manager unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Codec(#[from] protocol::CodecError),
}

#[derive(Debug, Error)]
pub enum RunnerError {
    /// Callback or lookup referenced a runner id with no in-flight record.
    #[error("task {0} not found")]
    UnknownTask(Uuid),

    /// A dispatch reused a runner id that is still in flight.
    #[error("task {0} already in flight")]
    DuplicateTask(Uuid),

    /// The scheduler found an empty NPU pool.
    #[error("no NPU available")]
    NoNpuAvailable,

    #[error("NPU {0} already exists")]
    NpuAlreadyRegistered(Uuid),

    #[error("NPU {0} not found (maybe expired)")]
    NpuNotRegistered(Uuid),

    /// A result callback carried a non-terminal status.
    #[error("callback status must be DONE or ERROR")]
    NonTerminalCallback,

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("NPU request failed: {0}")]
    Npu(#[from] reqwest::Error),
}
