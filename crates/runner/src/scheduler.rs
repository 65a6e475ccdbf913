//! NPU placement policy: least queued tasks, random tie-break.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};

use crate::session::{NpuEntry, NpuSession};

pub struct Scheduler {
    session: Arc<NpuSession>,
}

impl Scheduler {
    pub fn new(session: Arc<NpuSession>) -> Self {
        Self { session }
    }

    /// Pick the live NPU with the fewest queued tasks; ties are broken at
    /// random so equally idle workers share load. `None` only when the pool
    /// is empty.
    pub fn next_npu(&self) -> Option<NpuEntry> {
        let entries = self.session.live_entries();
        if entries.is_empty() {
            warn!("no NPUs found in session");
            return None;
        }

        let least = entries.iter().map(|e| e.metrics.queued_tasks).min()?;
        let mut candidates: Vec<NpuEntry> = entries
            .into_iter()
            .filter(|e| e.metrics.queued_tasks == least)
            .collect();

        let idx = if candidates.len() > 1 {
            rand::thread_rng().gen_range(0..candidates.len())
        } else {
            0
        };
        let selected = candidates.swap_remove(idx);
        debug!(npu_id = %selected.id, queued = selected.metrics.queued_tasks, "selected NPU");
        Some(selected)
    }
}
