//! Worker-local counters behind the heartbeat.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use protocol::NpuMetrics;

/// Uptime and task counters, shared between the HTTP handler, the worker
/// loops, and the heartbeat poller.
pub struct WorkerMetrics {
    started: Instant,
    successful: AtomicU64,
    failed: AtomicU64,
    queued: AtomicU64,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            queued: AtomicU64::new(0),
        }
    }

    pub fn job_queued(&self) -> u64 {
        self.queued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn job_started(&self) {
        // Saturating: a stray decrement must not wrap the gauge.
        let _ = self
            .queued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |q| q.checked_sub(1));
    }

    pub fn job_succeeded(&self) {
        self.successful.fetch_add(1, Ordering::SeqCst);
    }

    pub fn job_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn queue_depth(&self) -> u64 {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> NpuMetrics {
        NpuMetrics {
            uptime: self.started.elapsed().as_secs_f64(),
            successful_tasks: self.successful.load(Ordering::SeqCst),
            failed_tasks: self.failed.load(Ordering::SeqCst),
            queued_tasks: self.queued.load(Ordering::SeqCst),
        }
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
