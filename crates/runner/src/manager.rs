//! The task manager — synchronous façade over asynchronous NPU execution.
//!
//! [`TaskManager::run_node`] blocks until the worker posts a terminal
//! callback for the dispatch's runner id. The blocking is a condition wait
//! on a per-task [`Notify`], never a polled sleep: every callback mutation
//! happens before the waiter wakes.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use protocol::{NodeOutputs, NodeResult, RunNodeRequest, TaskRecord, TaskStatus};

use crate::npu_client::NpuClient;
use crate::scheduler::Scheduler;
use crate::secrets::SecretResolver;
use crate::RunnerError;

// ---------------------------------------------------------------------------
// InflightTable
// ---------------------------------------------------------------------------

struct TaskEntry {
    record: Mutex<TaskRecord>,
    done: Notify,
}

/// The in-flight task table, keyed by runner id.
///
/// Callbacks from NPUs land here concurrently with dispatch handlers;
/// per-record state sits behind its own lock and completion is signalled
/// through a stored-permit notify, so a result that arrives before the
/// waiter parks is never lost.
#[derive(Default)]
pub struct InflightTable {
    tasks: DashMap<Uuid, Arc<TaskEntry>>,
}

impl InflightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Insert a fresh QUEUED record. Rejects a runner id already in flight.
    pub fn insert(&self, record: TaskRecord) -> Result<(), RunnerError> {
        let runner_id = record.runner_id;
        match self.tasks.entry(runner_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RunnerError::DuplicateTask(runner_id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(TaskEntry {
                    record: Mutex::new(record),
                    done: Notify::new(),
                }));
                Ok(())
            }
        }
    }

    fn entry(&self, runner_id: Uuid) -> Result<Arc<TaskEntry>, RunnerError> {
        self.tasks
            .get(&runner_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(RunnerError::UnknownTask(runner_id))
    }

    /// Store the secret-resolved code on the record.
    pub async fn set_code(&self, runner_id: Uuid, code: String) -> Result<(), RunnerError> {
        let entry = self.entry(runner_id)?;
        entry.record.lock().await.code = code;
        Ok(())
    }

    pub async fn set_status(&self, runner_id: Uuid, status: TaskStatus) -> Result<(), RunnerError> {
        let entry = self.entry(runner_id)?;
        entry.record.lock().await.status = status;
        Ok(())
    }

    /// Append one remote log line.
    pub async fn add_log(&self, runner_id: Uuid, line: String) -> Result<(), RunnerError> {
        let entry = self.entry(runner_id)?;
        entry.record.lock().await.logs.push(line);
        Ok(())
    }

    /// Apply a terminal callback and wake the waiter.
    ///
    /// Idempotent: once a record is DONE or ERROR, repeated deliveries make
    /// no observable change.
    pub async fn complete(&self, runner_id: Uuid, result: NodeResult) -> Result<(), RunnerError> {
        if !result.status.is_terminal() {
            return Err(RunnerError::NonTerminalCallback);
        }
        let entry = self.entry(runner_id)?;

        {
            let mut record = entry.record.lock().await;
            if record.status.is_terminal() {
                warn!(%runner_id, "duplicate terminal callback ignored");
                return Ok(());
            }
            record.outputs = Some(NodeOutputs {
                nodes: result.nodes,
                outputs: result.outputs,
                status: result.status.to_string(),
                message: result.message,
            });
            record.status = result.status;
        }

        entry.done.notify_one();
        Ok(())
    }

    /// Block until the record reaches a terminal status.
    pub async fn wait_terminal(&self, runner_id: Uuid) -> Result<(), RunnerError> {
        let entry = self.entry(runner_id)?;
        loop {
            let notified = entry.done.notified();
            if entry.record.lock().await.status.is_terminal() {
                return Ok(());
            }
            notified.await;
        }
    }

    /// Remove the record and hand it back to the caller.
    pub async fn take(&self, runner_id: Uuid) -> Result<TaskRecord, RunnerError> {
        let (_, entry) = self
            .tasks
            .remove(&runner_id)
            .ok_or(RunnerError::UnknownTask(runner_id))?;
        let record = entry.record.lock().await.clone();
        Ok(record)
    }

    fn discard(&self, runner_id: Uuid) {
        self.tasks.remove(&runner_id);
    }
}

// ---------------------------------------------------------------------------
// TaskManager
// ---------------------------------------------------------------------------

/// Orchestrates one dispatch: record, resolve secrets, place, post, wait.
pub struct TaskManager {
    table: InflightTable,
    scheduler: Scheduler,
    resolver: SecretResolver,
    npu: NpuClient,
}

impl TaskManager {
    pub fn new(scheduler: Scheduler, resolver: SecretResolver, npu: NpuClient) -> Self {
        Self { table: InflightTable::new(), scheduler, resolver, npu }
    }

    /// Execute one node remotely and return its final record.
    ///
    /// Blocks until the NPU posts a terminal status for `runner_id`.
    #[instrument(skip(self, code, inputs), fields(node = %node_name, %runner_id))]
    pub async fn run_node(
        &self,
        node_name: String,
        code: String,
        inputs: Value,
        runner_id: Uuid,
    ) -> Result<TaskRecord, RunnerError> {
        self.table.insert(TaskRecord {
            node_name: node_name.clone(),
            runner_id,
            code: code.clone(),
            status: TaskStatus::Queued,
            inputs: inputs.clone(),
            logs: Vec::new(),
            outputs: None,
        })?;

        // Everything between insert and wait tears the record down on
        // failure so a dead dispatch never leaks an entry.
        let resolved = match self.resolver.resolve_encoded(&code).await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.table.discard(runner_id);
                return Err(e.into());
            }
        };
        self.table.set_code(runner_id, resolved.clone()).await?;

        let Some(npu) = self.scheduler.next_npu() else {
            self.table.discard(runner_id);
            return Err(RunnerError::NoNpuAvailable);
        };

        if !self.npu.check_connection(npu.id, &npu.address).await {
            warn!(npu_id = %npu.id, "NPU probe failed, dispatching anyway");
        }

        let request = RunNodeRequest {
            runner_id,
            code: resolved,
            inputs,
            node_name,
        };
        if let Err(e) = self.npu.run_node(npu.id, &npu.address, &request).await {
            self.table.discard(runner_id);
            return Err(e);
        }
        self.table.set_status(runner_id, TaskStatus::Running).await?;

        info!(npu_id = %npu.id, "job queued, waiting for callback");
        self.table.wait_terminal(runner_id).await?;

        let record = self.table.take(runner_id).await?;
        info!(status = %record.status, "task completed");
        Ok(record)
    }

    /// Terminal callback from an NPU (`POST /npu/result/{runner_id}`).
    pub async fn on_result(&self, runner_id: Uuid, result: NodeResult) -> Result<(), RunnerError> {
        self.table.complete(runner_id, result).await
    }

    /// Log callback from an NPU (`POST /npu/log/{runner_id}`).
    pub async fn on_log(&self, runner_id: Uuid, line: String) -> Result<(), RunnerError> {
        self.table.add_log(runner_id, line).await
    }

    pub fn inflight_count(&self) -> usize {
        self.table.len()
    }
}
