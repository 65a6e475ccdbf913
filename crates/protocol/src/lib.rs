//! `protocol` crate — the wire vocabulary shared by every flowgrid process.
//!
//! Everything that crosses an HTTP boundary (executor ⇄ runner ⇄ NPU ⇄
//! trace recorder ⇄ secret store) is defined here, so the services agree on
//! one set of serde shapes and status strings.

pub mod codec;
pub mod status;
pub mod wire;

pub use codec::{decode_code, encode_code, CodecError};
pub use status::{BlockStatus, TaskStatus};
pub use wire::{
    AddNodeRequest, AddNpuRequest, NodeExecutionData, NodeOutputs, NodeResult, NpuMetrics,
    RunAck, RunNodeRequest, TaskRecord,
};
