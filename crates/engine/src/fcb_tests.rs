//! Integration tests for the Flow Control Block.
//!
//! These use scripted mock implementations of the dispatcher, trace sink,
//! and queue hooks, so no Node Runner, trace recorder, or database is
//! required. The real HTTP implementations are exercised by the runner and
//! api crates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use uuid::Uuid;

use protocol::{BlockStatus, NodeExecutionData, NodeOutputs};

use crate::dispatch::{NodeDispatcher, TraceSink};
use crate::fcb::{FcbHooks, FlowControlBlock};
use crate::models::{Flow, FlowState, NodeSpec};
use crate::pool::WorkerPool;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Mocks
// ---------------------------------------------------------------------------

/// Dispatcher that answers from a per-node script.
///
/// With a gate attached, every dispatch consumes one gate permit, so tests
/// can step the flow forward deterministically. Call counts are bumped
/// before the gate is taken, letting a test observe "dispatch entered,
/// blocked" states.
struct ScriptedDispatcher {
    script: HashMap<String, NodeOutputs>,
    calls: Mutex<HashMap<String, usize>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedDispatcher {
    fn new(script: HashMap<String, NodeOutputs>, gate: Option<Arc<Semaphore>>) -> Arc<Self> {
        Arc::new(Self { script, calls: Mutex::new(HashMap::new()), gate })
    }

    fn calls_for(&self, node: &str) -> usize {
        self.calls.lock().unwrap().get(node).copied().unwrap_or(0)
    }
}

#[async_trait]
impl NodeDispatcher for ScriptedDispatcher {
    async fn dispatch(&self, node: &NodeSpec, inputs: &Value) -> NodeExecutionData {
        *self.calls.lock().unwrap().entry(node.name.clone()).or_insert(0) += 1;

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let runner_id = Uuid::new_v4();
        match self.script.get(&node.name) {
            Some(outputs) => NodeExecutionData {
                node_name: node.name.clone(),
                runner_id,
                code: node.code.clone(),
                status: "success".into(),
                inputs: inputs.clone(),
                logs: vec![],
                outputs: outputs.clone(),
            },
            None => NodeExecutionData {
                node_name: node.name.clone(),
                runner_id,
                code: node.code.clone(),
                status: "failed".into(),
                inputs: inputs.clone(),
                logs: vec![],
                outputs: NodeOutputs::error("no NPU reachable"),
            },
        }
    }
}

#[derive(Default)]
struct RecordingTracer {
    traces: Mutex<Vec<(Uuid, i32, NodeExecutionData)>>,
}

impl RecordingTracer {
    fn count(&self) -> usize {
        self.traces.lock().unwrap().len()
    }

    fn node_names(&self) -> Vec<String> {
        self.traces
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, d)| d.node_name.clone())
            .collect()
    }
}

#[async_trait]
impl TraceSink for RecordingTracer {
    async fn record(
        &self,
        flow_id: Uuid,
        flow_lvl: i32,
        data: &NodeExecutionData,
    ) -> Result<(), EngineError> {
        self.traces
            .lock()
            .unwrap()
            .push((flow_id, flow_lvl, data.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingHooks {
    checkpoints: Mutex<Vec<FlowState>>,
    retired: Mutex<Vec<Uuid>>,
}

impl RecordingHooks {
    fn checkpoint_count(&self) -> usize {
        self.checkpoints.lock().unwrap().len()
    }

    fn retired_count(&self) -> usize {
        self.retired.lock().unwrap().len()
    }
}

#[async_trait]
impl FcbHooks for RecordingHooks {
    async fn checkpoint(&self, _flow_id: Uuid, state: FlowState) -> Result<(), EngineError> {
        self.checkpoints.lock().unwrap().push(state);
        Ok(())
    }

    async fn retire(&self, flow_id: Uuid) -> Result<(), EngineError> {
        self.retired.lock().unwrap().push(flow_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn spec(name: &str) -> NodeSpec {
    NodeSpec {
        name: name.into(),
        code: protocol::encode_code(&format!("// node {name}")),
        flow_lvl: 1,
    }
}

fn done(nodes: &[&str], outputs: Value) -> NodeOutputs {
    NodeOutputs {
        nodes: nodes.iter().map(|s| s.to_string()).collect(),
        outputs,
        status: "DONE".into(),
        message: "run successfully".into(),
    }
}

/// Flow whose pointer sits on `ids[0]`, with every id a member node.
fn flow_over(ids: &[&str]) -> Flow {
    let nodes: HashMap<String, NodeSpec> =
        ids.iter().map(|id| (id.to_string(), spec(id))).collect();
    Flow::new(nodes, json!({}), Some(spec(ids[0]))).expect("valid flow")
}

struct Harness {
    fcb: Arc<FlowControlBlock>,
    dispatcher: Arc<ScriptedDispatcher>,
    tracer: Arc<RecordingTracer>,
    hooks: Arc<RecordingHooks>,
}

fn harness(
    flow: Flow,
    script: HashMap<String, NodeOutputs>,
    gate: Option<Arc<Semaphore>>,
) -> Harness {
    let dispatcher = ScriptedDispatcher::new(script, gate);
    let tracer = Arc::new(RecordingTracer::default());
    let hooks = Arc::new(RecordingHooks::default());
    let fcb = FlowControlBlock::new(
        flow,
        Uuid::new_v4(),
        WorkerPool::new(4),
        dispatcher.clone(),
        tracer.clone(),
        hooks.clone(),
    );
    Harness { fcb, dispatcher, tracer, hooks }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn linear_flow_runs_both_nodes_in_order() {
    let script = HashMap::from([
        ("start".to_string(), done(&["n1"], json!({"a": 1, "b": 2}))),
        ("n1".to_string(), done(&[], json!({"out": 3}))),
    ]);
    let h = harness(flow_over(&["start", "n1"]), script, None);

    h.fcb.start().await;
    wait_until(|| h.hooks.retired_count() == 1).await;

    assert_eq!(h.tracer.node_names(), vec!["start", "n1"]);
    {
        let traces = h.tracer.traces.lock().unwrap();
        // Second node received the first node's outputs as inputs.
        assert_eq!(traces[1].2.inputs, json!({"a": 1, "b": 2}));
        assert_eq!(traces[1].2.outputs.outputs, json!({"out": 3}));
        assert_eq!(traces[0].1, 1); // flow_lvl carried through
    }

    // One checkpoint: after the start → n1 pointer advance.
    assert_eq!(h.hooks.checkpoint_count(), 1);
    let checkpoints = h.hooks.checkpoints.lock().unwrap();
    assert_eq!(
        checkpoints[0].curr_node.as_ref().map(|n| n.name.as_str()),
        Some("n1")
    );
    drop(checkpoints);

    assert_eq!(h.fcb.status().await, BlockStatus::Stop);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_pointer_terminates_without_traces() {
    let nodes: HashMap<String, NodeSpec> = HashMap::from([("a".to_string(), spec("a"))]);
    let flow = Flow::new(nodes, json!({}), None).unwrap();
    let h = harness(flow, HashMap::new(), None);

    h.fcb.start().await;
    wait_until(|| h.hooks.retired_count() == 1).await;

    assert_eq!(h.tracer.count(), 0);
    assert_eq!(h.fcb.status().await, BlockStatus::Stop);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_successor_stops_with_exactly_one_trace() {
    let script = HashMap::from([("start".to_string(), done(&["ghost"], json!({})))]);
    let h = harness(flow_over(&["start"]), script, None);

    h.fcb.start().await;
    wait_until(|| h.hooks.retired_count() == 1).await;

    assert_eq!(h.tracer.node_names(), vec!["start"]);
    assert_eq!(h.hooks.checkpoint_count(), 0);
    assert_eq!(h.fcb.status().await, BlockStatus::Stop);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_dispatch_stops_the_flow() {
    // No script entry for "start" → the dispatcher reports a failure.
    let h = harness(flow_over(&["start", "n1"]), HashMap::new(), None);

    h.fcb.start().await;
    wait_until(|| h.hooks.retired_count() == 1).await;

    let traces = h.tracer.traces.lock().unwrap();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].2.status, "failed");
    drop(traces);

    assert_eq!(h.dispatcher.calls_for("n1"), 0);
    assert_eq!(h.fcb.status().await, BlockStatus::Stop);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn node_error_output_is_a_step_failure() {
    let mut error_outputs = done(&["n1"], json!({}));
    error_outputs.status = "ERROR".into();
    error_outputs.message = "boom".into();
    let script = HashMap::from([("start".to_string(), error_outputs)]);
    let h = harness(flow_over(&["start", "n1"]), script, None);

    h.fcb.start().await;
    wait_until(|| h.hooks.retired_count() == 1).await;

    // The error trace exists, but the successor it named was never queued.
    assert_eq!(h.tracer.node_names(), vec!["start"]);
    assert_eq!(h.dispatcher.calls_for("n1"), 0);
    assert_eq!(h.fcb.status().await, BlockStatus::Stop);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pause_lets_inflight_step_finish_but_blocks_the_next() {
    let gate = Arc::new(Semaphore::new(0));
    let script = HashMap::from([
        ("a".to_string(), done(&["b"], json!({"step": 1}))),
        ("b".to_string(), done(&["c"], json!({"step": 2}))),
        ("c".to_string(), done(&[], json!({"step": 3}))),
    ]);
    let h = harness(flow_over(&["a", "b", "c"]), script, Some(gate.clone()));

    h.fcb.start().await;
    gate.add_permits(1);

    // Step b has been dispatched (blocked on the gate) — pause now.
    wait_until(|| h.dispatcher.calls_for("b") == 1).await;
    h.fcb.pause().await;

    // Let step b finish: it must complete and checkpoint, then go quiet.
    gate.add_permits(1);
    wait_until(|| h.tracer.count() == 2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.tracer.count(), 2);
    assert_eq!(h.dispatcher.calls_for("c"), 0);
    assert_eq!(h.hooks.checkpoint_count(), 2);
    assert_eq!(h.fcb.status().await, BlockStatus::Pause);

    // Resume runs the tail of the chain.
    h.fcb.resume().await;
    gate.add_permits(1);
    wait_until(|| h.hooks.retired_count() == 1).await;

    assert_eq!(h.tracer.node_names(), vec!["a", "b", "c"]);
    assert_eq!(h.fcb.status().await, BlockStatus::Stop);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resume_on_running_block_never_double_dispatches() {
    let gate = Arc::new(Semaphore::new(0));
    let script = HashMap::from([
        ("a".to_string(), done(&["b"], json!({}))),
        ("b".to_string(), done(&[], json!({}))),
    ]);
    let h = harness(flow_over(&["a", "b"]), script, Some(gate.clone()));

    h.fcb.start().await;
    wait_until(|| h.dispatcher.calls_for("a") == 1).await;

    // Block is in START, step in flight: resume must be a no-op.
    h.fcb.resume().await;
    h.fcb.resume().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.dispatcher.calls_for("a"), 1);

    gate.add_permits(2);
    wait_until(|| h.hooks.retired_count() == 1).await;

    assert_eq!(h.dispatcher.calls_for("a"), 1);
    assert_eq!(h.dispatcher.calls_for("b"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_discards_the_inflight_result() {
    let gate = Arc::new(Semaphore::new(0));
    let script = HashMap::from([
        ("a".to_string(), done(&["b"], json!({}))),
        ("b".to_string(), done(&[], json!({}))),
    ]);
    let h = harness(flow_over(&["a", "b"]), script, Some(gate.clone()));

    h.fcb.start().await;
    wait_until(|| h.dispatcher.calls_for("a") == 1).await;

    h.fcb.stop().await;
    gate.add_permits(1);

    // The step emits its trace, then its result is thrown away.
    wait_until(|| h.tracer.count() == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.dispatcher.calls_for("b"), 0);
    assert_eq!(h.hooks.checkpoint_count(), 0);
    // The queue deletes the document on an explicit stop; the block itself
    // does not retire here.
    assert_eq!(h.hooks.retired_count(), 0);
    assert_eq!(h.fcb.status().await, BlockStatus::Stop);
}

#[tokio::test]
async fn snapshot_restore_round_trips() {
    let script = HashMap::new();
    let h = harness(flow_over(&["a", "b"]), script, None);

    let snapshot = h.fcb.snapshot().await;
    assert_eq!(snapshot.status, BlockStatus::Queued);

    let restored = FlowControlBlock::restore(
        snapshot.clone(),
        WorkerPool::new(1),
        h.dispatcher.clone(),
        h.tracer.clone(),
        h.hooks.clone(),
    )
    .expect("restore should succeed");

    let again = restored.snapshot().await;
    assert_eq!(again.flow_id, snapshot.flow_id);
    assert_eq!(again.status, snapshot.status);
    assert_eq!(again.flow, snapshot.flow);
}

#[tokio::test]
async fn start_on_stopped_block_is_ignored() {
    let h = harness(flow_over(&["a"]), HashMap::new(), None);

    h.fcb.stop().await;
    h.fcb.start().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.dispatcher.calls_for("a"), 0);
    assert_eq!(h.fcb.status().await, BlockStatus::Stop);
}
