//! The Flow Control Block — per-flow state machine and step driver.
//!
//! One FCB owns one flow. `start` submits the first step to the shared
//! worker pool; every step dispatches the pointed-at node, records a trace,
//! enqueues successors, advances the pointer, checkpoints, and — while the
//! block is still in `START` — submits the next step. Steps of one FCB are
//! therefore strictly sequential.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use protocol::{BlockStatus, NodeExecutionData};

use crate::dispatch::{NodeDispatcher, TraceSink};
use crate::models::{Flow, FlowState, NodeSpec};
use crate::pool::WorkerPool;
use crate::EngineError;

// ---------------------------------------------------------------------------
// FcbHooks
// ---------------------------------------------------------------------------

/// Callbacks into the owning queue.
///
/// `checkpoint` upserts the flow document after a pointer advance; `retire`
/// removes the block from the registry and deletes the document once the
/// flow reaches a terminal state.
#[async_trait]
pub trait FcbHooks: Send + Sync {
    async fn checkpoint(&self, flow_id: Uuid, state: FlowState) -> Result<(), EngineError>;
    async fn retire(&self, flow_id: Uuid) -> Result<(), EngineError>;
}

// ---------------------------------------------------------------------------
// FcbSnapshot
// ---------------------------------------------------------------------------

/// Serialized image of an FCB.
///
/// The pending queue is deliberately absent: it is a transient intra-step
/// buffer, rebuilt from the next node's outputs after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcbSnapshot {
    pub flow_id: Uuid,
    pub flow: FlowState,
    pub status: BlockStatus,
}

// ---------------------------------------------------------------------------
// FlowControlBlock
// ---------------------------------------------------------------------------

struct FcbState {
    flow: Flow,
    /// Successors of the last executed node, in emission order.
    pending: VecDeque<(NodeSpec, Value)>,
    status: BlockStatus,
}

pub struct FlowControlBlock {
    flow_id: Uuid,
    state: Mutex<FcbState>,
    pool: WorkerPool,
    dispatcher: Arc<dyn NodeDispatcher>,
    tracer: Arc<dyn TraceSink>,
    hooks: Arc<dyn FcbHooks>,
}

impl FlowControlBlock {
    pub fn new(
        flow: Flow,
        flow_id: Uuid,
        pool: WorkerPool,
        dispatcher: Arc<dyn NodeDispatcher>,
        tracer: Arc<dyn TraceSink>,
        hooks: Arc<dyn FcbHooks>,
    ) -> Arc<Self> {
        info!(%flow_id, "flow control block initialized in QUEUED state");
        Arc::new(Self {
            flow_id,
            state: Mutex::new(FcbState {
                flow,
                pending: VecDeque::new(),
                status: BlockStatus::Queued,
            }),
            pool,
            dispatcher,
            tracer,
            hooks,
        })
    }

    /// Rebuild an FCB from a persisted snapshot. The block comes back in the
    /// snapshot's status and is NOT started automatically.
    pub fn restore(
        snapshot: FcbSnapshot,
        pool: WorkerPool,
        dispatcher: Arc<dyn NodeDispatcher>,
        tracer: Arc<dyn TraceSink>,
        hooks: Arc<dyn FcbHooks>,
    ) -> Result<Arc<Self>, EngineError> {
        let flow = Flow::from_state(snapshot.flow)?;
        info!(flow_id = %snapshot.flow_id, status = %snapshot.status, "flow control block restored");
        Ok(Arc::new(Self {
            flow_id: snapshot.flow_id,
            state: Mutex::new(FcbState {
                flow,
                pending: VecDeque::new(),
                status: snapshot.status,
            }),
            pool,
            dispatcher,
            tracer,
            hooks,
        }))
    }

    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    pub async fn status(&self) -> BlockStatus {
        self.state.lock().await.status
    }

    pub async fn snapshot(&self) -> FcbSnapshot {
        let state = self.state.lock().await;
        FcbSnapshot {
            flow_id: self.flow_id,
            flow: state.flow.to_state(),
            status: state.status,
        }
    }

    /// The flow image persisted by the checkpoint hook.
    pub async fn flow_state(&self) -> FlowState {
        self.state.lock().await.flow.to_state()
    }

    // -----------------------------------------------------------------------
    // Lifecycle operations
    // -----------------------------------------------------------------------

    /// QUEUED → START (also PAUSE → START via `resume`). Submits one step.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if state.status != BlockStatus::Queued {
                warn!(flow_id = %self.flow_id, status = %state.status, "start ignored");
                return;
            }
            state.status = BlockStatus::Start;
        }
        info!(flow_id = %self.flow_id, "flow control block starting");
        self.submit_step();
    }

    /// START → PAUSE. An in-flight step runs to completion (including its
    /// checkpoint); only the next submission is suppressed.
    pub async fn pause(&self) {
        let mut state = self.state.lock().await;
        if state.status == BlockStatus::Start {
            state.status = BlockStatus::Pause;
            info!(flow_id = %self.flow_id, "flow control block paused");
        }
    }

    /// PAUSE → START. No-op on any other status, so it never double-submits.
    pub async fn resume(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if state.status != BlockStatus::Pause {
                return;
            }
            state.status = BlockStatus::Start;
        }
        info!(flow_id = %self.flow_id, "flow control block resuming");
        self.submit_step();
    }

    /// Any → STOP. Terminal; an in-flight step's result is discarded when it
    /// lands.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if state.status != BlockStatus::Stop {
            state.status = BlockStatus::Stop;
            info!(flow_id = %self.flow_id, "flow control block stopped");
        }
    }

    // -----------------------------------------------------------------------
    // Step driving
    // -----------------------------------------------------------------------

    fn submit_step(self: &Arc<Self>) {
        let fcb = Arc::clone(self);
        self.pool.submit(async move {
            fcb.run_node().await;
        });
    }

    /// Stop and retire: the flow is finished (normally or on failure) and
    /// its durable document must go away.
    async fn terminate(&self) {
        self.stop().await;
        if let Err(e) = self.hooks.retire(self.flow_id).await {
            error!(flow_id = %self.flow_id, "retire hook failed: {e}");
        }
    }

    /// One step: dispatch → trace → enqueue successors → advance →
    /// checkpoint → maybe submit the next step.
    #[instrument(skip(self), fields(flow_id = %self.flow_id))]
    async fn run_node(self: Arc<Self>) {
        // 1. Read the pointer.
        let pointer = {
            let state = self.state.lock().await;
            state.flow.pointer().map(|(n, i)| (n.clone(), i.clone()))
        };
        let Some((node, inputs)) = pointer else {
            info!("reached end of flow");
            self.terminate().await;
            return;
        };

        // 2. Dispatch and block until the remote result lands.
        info!(node = %node.name, "executing node");
        let result = self.dispatcher.dispatch(&node, &inputs).await;
        info!(node = %node.name, status = %result.status, "node executed");

        // 3. One trace per step, success or failure. Trace loss is logged,
        //    never fatal to the step.
        if let Err(e) = self
            .tracer
            .record(self.flow_id, node.flow_lvl, &result)
            .await
        {
            warn!(node = %node.name, "failed to record trace: {e}");
        }

        if result.is_failure() {
            error!(node = %node.name, message = %result.outputs.message, "step failed");
            self.terminate().await;
            return;
        }

        // A stop that raced the dispatch discards the result here; the queue
        // already deleted the durable document.
        if self.status().await == BlockStatus::Stop {
            info!(node = %node.name, "discarding result of stopped flow");
            return;
        }

        // 4/5. Enqueue successors, then advance or terminate.
        match self.advance(&result).await {
            Ok(true) => {}
            Ok(false) => {
                info!("no more nodes to execute");
                self.terminate().await;
                return;
            }
            Err(e) => {
                error!("cannot advance flow: {e}");
                self.terminate().await;
                return;
            }
        }

        // 6. Checkpoint the advanced pointer. Best-effort: a failed upsert
        //    costs replay after a crash, not the step.
        let state = self.flow_state().await;
        if let Err(e) = self.hooks.checkpoint(self.flow_id, state).await {
            error!("checkpoint failed: {e}");
        }

        // 7. Keep going only while still in START.
        if self.status().await == BlockStatus::Start {
            self.submit_step();
        }
    }

    /// Append every successor to the pending queue, then pop the head into
    /// the pointer. `Ok(false)` means the flow has nothing left to run.
    async fn advance(&self, result: &NodeExecutionData) -> Result<bool, EngineError> {
        let mut state = self.state.lock().await;

        for name in &result.outputs.nodes {
            let Some(next) = state.flow.nodes.get(name).cloned() else {
                return Err(EngineError::UnknownNode(name.clone()));
            };
            state.pending.push_back((next, result.outputs.outputs.clone()));
        }

        match state.pending.pop_front() {
            Some((next, next_inputs)) => {
                info!(node = %next.name, "pointer set to next node");
                state.flow.set_pointer(next, next_inputs)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
