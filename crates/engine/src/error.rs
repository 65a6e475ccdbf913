//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the flow engine (model validation + step driving).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// The pointer (or a successor) references a node the flow doesn't own.
    #[error("node '{0}' not present in flow")]
    UnknownNode(String),

    /// A persisted flow document could not be decoded.
    #[error("invalid flow state: {0}")]
    InvalidState(#[from] serde_json::Error),

    // ------ Collaborator errors ------

    /// The trace recorder rejected or never received a trace.
    #[error("trace recorder error: {0}")]
    Trace(String),

    /// The durable checkpoint store failed.
    #[error("checkpoint storage error: {0}")]
    Storage(String),
}
