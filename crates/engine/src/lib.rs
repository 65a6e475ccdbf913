//! `engine` crate — the flow domain model and the Flow Control Block.
//!
//! A [`FlowControlBlock`] drives one flow from its current pointer to
//! completion, one node per step: dispatch to the Node Runner, record a
//! trace, enqueue successors, advance the pointer, checkpoint. The HTTP
//! collaborators sit behind the traits in [`dispatch`] so the state machine
//! is testable without a network.

pub mod dispatch;
pub mod error;
pub mod fcb;
pub mod models;
pub mod pool;

pub use dispatch::{HttpNodeDispatcher, HttpTraceSink, NodeDispatcher, TraceSink};
pub use error::EngineError;
pub use fcb::{FcbHooks, FcbSnapshot, FlowControlBlock};
pub use models::{Flow, FlowState, NodeSpec};
pub use pool::WorkerPool;

#[cfg(test)]
mod fcb_tests;
