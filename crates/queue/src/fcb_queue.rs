//! The FCB registry and its durable backing store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{error, info};
use uuid::Uuid;

use db::DbPool;
use engine::{
    EngineError, FcbHooks, Flow, FlowControlBlock, FlowState, NodeDispatcher, TraceSink,
    WorkerPool,
};

use crate::QueueError;

type BlockMap = Arc<DashMap<Uuid, Arc<FlowControlBlock>>>;

// ---------------------------------------------------------------------------
// QueueHooks
// ---------------------------------------------------------------------------

/// The engine's callbacks, backed by the checkpoint table and the registry.
struct QueueHooks {
    blocks: BlockMap,
    pool: DbPool,
}

#[async_trait]
impl FcbHooks for QueueHooks {
    async fn checkpoint(&self, flow_id: Uuid, state: FlowState) -> Result<(), EngineError> {
        let document = serde_json::to_value(&state)?;
        db::repository::checkpoints::upsert_flow(&self.pool, flow_id, document)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        info!(%flow_id, "flow state saved to storage");
        Ok(())
    }

    async fn retire(&self, flow_id: Uuid) -> Result<(), EngineError> {
        self.blocks.remove(&flow_id);
        db::repository::checkpoints::delete_flow(&self.pool, flow_id)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        info!(%flow_id, "flow retired and removed from storage");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FcbQueue
// ---------------------------------------------------------------------------

/// Registry `flow_id → FCB` plus the durable checkpoint store.
pub struct FcbQueue {
    blocks: BlockMap,
    worker_pool: WorkerPool,
    db: DbPool,
    dispatcher: Arc<dyn NodeDispatcher>,
    tracer: Arc<dyn TraceSink>,
    hooks: Arc<QueueHooks>,
}

impl FcbQueue {
    pub fn new(
        db: DbPool,
        dispatcher: Arc<dyn NodeDispatcher>,
        tracer: Arc<dyn TraceSink>,
        workers: usize,
    ) -> Self {
        let blocks: BlockMap = Arc::new(DashMap::new());
        let hooks = Arc::new(QueueHooks { blocks: Arc::clone(&blocks), pool: db.clone() });
        Self {
            blocks,
            worker_pool: WorkerPool::new(workers),
            db,
            dispatcher,
            tracer,
            hooks,
        }
    }

    /// Register a new flow. The block starts in QUEUED; call [`Self::start`].
    pub fn add(&self, state: FlowState) -> Result<Uuid, QueueError> {
        let flow = Flow::from_state(state)?;
        let flow_id = Uuid::new_v4();
        let fcb = FlowControlBlock::new(
            flow,
            flow_id,
            self.worker_pool.clone(),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.tracer),
            self.hooks.clone(),
        );
        self.blocks.insert(flow_id, fcb);
        info!(%flow_id, "added new flow control block");
        Ok(flow_id)
    }

    fn get(&self, flow_id: Uuid) -> Result<Arc<FlowControlBlock>, QueueError> {
        self.blocks
            .get(&flow_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(QueueError::UnknownFlow(flow_id))
    }

    pub fn contains(&self, flow_id: Uuid) -> bool {
        self.blocks.contains_key(&flow_id)
    }

    pub async fn start(&self, flow_id: Uuid) -> Result<(), QueueError> {
        let fcb = self.get(flow_id)?;
        fcb.start().await;
        Ok(())
    }

    pub async fn pause(&self, flow_id: Uuid) -> Result<(), QueueError> {
        let fcb = self.get(flow_id)?;
        fcb.pause().await;
        Ok(())
    }

    pub async fn resume(&self, flow_id: Uuid) -> Result<(), QueueError> {
        let fcb = self.get(flow_id)?;
        fcb.resume().await;
        Ok(())
    }

    /// Stop a flow and delete its durable document. The flow cannot be
    /// resumed afterwards.
    pub async fn stop(&self, flow_id: Uuid) -> Result<(), QueueError> {
        let fcb = self.get(flow_id)?;
        fcb.stop().await;
        self.blocks.remove(&flow_id);
        db::repository::checkpoints::delete_flow(&self.db, flow_id).await?;
        info!(%flow_id, "flow stopped and deleted");
        Ok(())
    }

    /// Recover every checkpointed flow from storage and start it.
    ///
    /// Individual documents that fail to decode are logged and skipped; they
    /// never abort the rest of the recovery.
    pub async fn recover_from_storage(&self) -> Result<usize, QueueError> {
        info!("starting recovery of flow control blocks from storage");
        let rows = db::repository::checkpoints::list_flows(&self.db).await?;

        let mut recovered = 0;
        for row in rows {
            let flow_id = row.flow_id;
            match self.recover_one(flow_id, row.state).await {
                Ok(()) => {
                    recovered += 1;
                    info!(%flow_id, "recovered and started flow from storage");
                }
                Err(e) => {
                    error!(%flow_id, "failed to recover flow: {e}");
                }
            }
        }

        info!(recovered, "recovery finished");
        Ok(recovered)
    }

    async fn recover_one(
        &self,
        flow_id: Uuid,
        document: serde_json::Value,
    ) -> Result<(), QueueError> {
        let state: FlowState = serde_json::from_value(document)?;
        let flow = Flow::from_state(state)?;
        let fcb = FlowControlBlock::new(
            flow,
            flow_id,
            self.worker_pool.clone(),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.tracer),
            self.hooks.clone(),
        );
        self.blocks.insert(flow_id, Arc::clone(&fcb));
        fcb.start().await;
        Ok(())
    }

    /// Stop every block and refuse further step submissions. Durable
    /// documents are kept: paused/running flows resume on the next boot.
    pub async fn clean_up(&self) {
        info!("cleaning up all flow control blocks");
        let ids: Vec<Uuid> = self.blocks.iter().map(|e| *e.key()).collect();
        for flow_id in ids {
            if let Some((_, fcb)) = self.blocks.remove(&flow_id) {
                fcb.stop().await;
            }
        }
        self.worker_pool.close();
    }
}
