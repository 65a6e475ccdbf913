//! The NPU session — registry of live worker processes.
//!
//! Entries are created by `/npu/add`, refreshed by every `/npu/pool/{id}`
//! heartbeat, and dropped by a background sweeper once they go quiet for
//! longer than the expiry window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use protocol::NpuMetrics;

use crate::RunnerError;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Entry / wire view
// ---------------------------------------------------------------------------

/// One registered NPU as tracked internally.
#[derive(Debug, Clone)]
pub struct NpuEntry {
    pub id: Uuid,
    pub address: String,
    pub status: String,
    pub last_seen: Instant,
    pub metrics: NpuMetrics,
}

/// Wire view of an entry, as returned by `/npu/add` and `/npu/all`.
#[derive(Debug, Clone, Serialize)]
pub struct NpuStatus {
    pub id: Uuid,
    pub address: String,
    pub status: String,
    /// Seconds since the last heartbeat.
    pub idle_secs: f64,
    pub metrics: NpuMetrics,
}

impl NpuEntry {
    fn to_status(&self) -> NpuStatus {
        NpuStatus {
            id: self.id,
            address: self.address.clone(),
            status: self.status.clone(),
            idle_secs: self.last_seen.elapsed().as_secs_f64(),
            metrics: self.metrics.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// NpuSession
// ---------------------------------------------------------------------------

/// Shared in-memory NPU table with heartbeat-based liveness.
pub struct NpuSession {
    entries: DashMap<Uuid, NpuEntry>,
    expiry: Duration,
}

impl NpuSession {
    pub fn new(expiry: Duration) -> Arc<Self> {
        Arc::new(Self { entries: DashMap::new(), expiry })
    }

    /// Register a new NPU. Fails if the id is already present.
    pub fn add_npu(&self, id: Uuid, address: String) -> Result<NpuStatus, RunnerError> {
        if self.entries.contains_key(&id) {
            return Err(RunnerError::NpuAlreadyRegistered(id));
        }
        let entry = NpuEntry {
            id,
            address,
            status: "idle".to_string(),
            last_seen: Instant::now(),
            metrics: NpuMetrics::default(),
        };
        let status = entry.to_status();
        self.entries.insert(id, entry);
        info!(npu_id = %id, address = %status.address, "registered new NPU");
        Ok(status)
    }

    /// Overwrite metrics and reset the expiry timer. Fails if absent.
    pub fn update_metrics(&self, id: Uuid, metrics: NpuMetrics) -> Result<NpuStatus, RunnerError> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(RunnerError::NpuNotRegistered(id))?;
        entry.metrics = metrics;
        entry.last_seen = Instant::now();
        Ok(entry.to_status())
    }

    pub fn get_npu_by_id(&self, id: Uuid) -> Result<NpuStatus, RunnerError> {
        self.entries
            .get(&id)
            .map(|e| e.to_status())
            .ok_or(RunnerError::NpuNotRegistered(id))
    }

    pub fn get_all_npus(&self) -> Vec<NpuStatus> {
        self.entries.iter().map(|e| e.to_status()).collect()
    }

    /// Internal clones for the scheduler.
    pub(crate) fn live_entries(&self) -> Vec<NpuEntry> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    /// Drop every entry idle longer than the expiry window. Removal is
    /// atomic per entry: record and pool membership go together.
    pub fn sweep(&self) -> usize {
        let expiry = self.expiry;
        let mut removed = 0;
        self.entries.retain(|id, entry| {
            let live = entry.last_seen.elapsed() <= expiry;
            if !live {
                warn!(npu_id = %id, "removed inactive NPU");
                removed += 1;
            }
            live
        });
        removed
    }

    /// Run [`Self::sweep`] forever on a fixed cadence.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                session.sweep();
            }
        })
    }
}
