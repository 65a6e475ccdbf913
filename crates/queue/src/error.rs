//! Queue-level error type.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The flow id is not registered (unknown or already stopped).
    #[error("flow {0} not found")]
    UnknownFlow(Uuid),

    #[error(transparent)]
    Engine(#[from] engine::EngineError),

    #[error(transparent)]
    Db(#[from] db::DbError),

    #[error("invalid flow document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}
