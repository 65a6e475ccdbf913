//! `queue` crate — the durable Flow Control Block queue.
//!
//! Owns the registry of live FCBs and their persisted documents: add/start/
//! pause/resume/stop by flow id, recovery of every checkpointed flow on
//! boot, and the checkpoint/retire hooks the engine calls after each step.

pub mod config;
pub mod error;
pub mod fcb_queue;

pub use config::ExecutorConfig;
pub use error::QueueError;
pub use fcb_queue::FcbQueue;
