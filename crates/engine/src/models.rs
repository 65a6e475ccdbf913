//! Core domain models for the flow engine.
//!
//! These types are the source of truth for what a flow looks like in
//! memory. [`FlowState`] is the serde image persisted as the `state` column
//! of the checkpoint store and accepted by `POST /fcb/add`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::EngineError;

// ---------------------------------------------------------------------------
// NodeSpec
// ---------------------------------------------------------------------------

/// A single node definition, immutable for the life of its flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique identifier within the flow (referenced by successor lists).
    pub name: String,
    /// Opaque base64-encoded source blob.
    pub code: String,
    /// Nesting depth, carried through to the trace recorder.
    pub flow_lvl: i32,
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// A mapping `name → NodeSpec` plus the execution pointer.
///
/// Invariant: if the pointer is set, the pointed-at node is a member of
/// `nodes`. A cleared pointer means the flow has completed.
#[derive(Debug, Clone)]
pub struct Flow {
    pub nodes: HashMap<String, NodeSpec>,
    curr_node: Option<NodeSpec>,
    curr_inp: Value,
}

impl Flow {
    /// Build a flow, enforcing the pointer-membership invariant.
    pub fn new(
        nodes: HashMap<String, NodeSpec>,
        curr_inp: Value,
        curr_node: Option<NodeSpec>,
    ) -> Result<Self, EngineError> {
        if let Some(node) = &curr_node {
            if !nodes.contains_key(&node.name) {
                return Err(EngineError::UnknownNode(node.name.clone()));
            }
        }
        Ok(Self { nodes, curr_node, curr_inp })
    }

    /// Move the pointer to `node` with the inputs its execution will receive.
    pub fn set_pointer(&mut self, node: NodeSpec, inp_data: Value) -> Result<(), EngineError> {
        if !self.nodes.contains_key(&node.name) {
            return Err(EngineError::UnknownNode(node.name.clone()));
        }
        tracing::debug!(node = %node.name, "pointer advanced");
        self.curr_node = Some(node);
        self.curr_inp = inp_data;
        Ok(())
    }

    /// The `(curr_node, curr_inp)` pair, or `None` when the flow is done.
    pub fn pointer(&self) -> Option<(&NodeSpec, &Value)> {
        self.curr_node.as_ref().map(|n| (n, &self.curr_inp))
    }

    pub fn to_state(&self) -> FlowState {
        FlowState {
            nodes: self.nodes.clone(),
            curr_inp_data: self.curr_inp.clone(),
            curr_node: self.curr_node.clone(),
        }
    }

    pub fn from_state(state: FlowState) -> Result<Self, EngineError> {
        Self::new(state.nodes, state.curr_inp_data, state.curr_node)
    }
}

// ---------------------------------------------------------------------------
// FlowState
// ---------------------------------------------------------------------------

/// Serialized image of a [`Flow`], field names as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    pub nodes: HashMap<String, NodeSpec>,
    pub curr_inp_data: Value,
    pub curr_node: Option<NodeSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str) -> NodeSpec {
        NodeSpec { name: name.into(), code: "Y29kZQ==".into(), flow_lvl: 1 }
    }

    fn two_node_map() -> HashMap<String, NodeSpec> {
        [("a".to_string(), spec("a")), ("b".to_string(), spec("b"))].into()
    }

    #[test]
    fn pointer_must_reference_a_member_node() {
        let err = Flow::new(two_node_map(), json!({}), Some(spec("ghost")));
        assert!(matches!(err, Err(EngineError::UnknownNode(name)) if name == "ghost"));
    }

    #[test]
    fn set_pointer_rejects_foreign_node() {
        let mut flow = Flow::new(two_node_map(), json!({}), Some(spec("a"))).unwrap();
        assert!(flow.set_pointer(spec("ghost"), json!({})).is_err());
        // Pointer is untouched after the rejected move.
        assert_eq!(flow.pointer().unwrap().0.name, "a");
    }

    #[test]
    fn state_round_trip_preserves_flow() {
        let flow = Flow::new(two_node_map(), json!({"x": 1}), Some(spec("b"))).unwrap();
        let state = flow.to_state();
        let json = serde_json::to_value(&state).unwrap();
        let back: FlowState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);

        let restored = Flow::from_state(back).unwrap();
        assert_eq!(restored.pointer().unwrap().0.name, "b");
        assert_eq!(restored.pointer().unwrap().1, &json!({"x": 1}));
        assert_eq!(restored.nodes.len(), 2);
    }

    #[test]
    fn completed_flow_has_no_pointer() {
        let flow = Flow::new(two_node_map(), json!({}), None).unwrap();
        assert!(flow.pointer().is_none());
    }
}
