//! NPU worker error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NpuError {
    #[error("job queue is full")]
    QueueFull,

    #[error("job process failed: {0}")]
    JobFailed(String),

    #[error(transparent)]
    Codec(#[from] protocol::CodecError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("node runner request failed: {0}")]
    Http(#[from] reqwest::Error),
}
