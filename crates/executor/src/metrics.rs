//! Worker counters for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single worker
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Batches pushed through the executor
    batch_count: AtomicU64,
    /// Records pushed through the executor
    record_count: AtomicU64,
    /// Records reported failed
    failed_count: AtomicU64,
    /// Batches that stopped the worker
    structural_count: AtomicU64,
    /// Batches dropped due to full queue
    dropped_count: AtomicU64,
    /// Failed records that could not be handed back
    lost_count: AtomicU64,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn batch_count(&self) -> u64 {
        self.batch_count.load(Ordering::Relaxed)
    }

    pub fn record_count(&self) -> u64 {
        self.record_count.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    /// Account one completed batch
    pub fn record_batch(&self, records: usize, failed: usize) {
        self.batch_count.fetch_add(1, Ordering::Relaxed);
        self.record_count.fetch_add(records as u64, Ordering::Relaxed);
        self.failed_count.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn structural_count(&self) -> u64 {
        self.structural_count.load(Ordering::Relaxed)
    }

    pub fn inc_structural_count(&self) {
        self.structural_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lost_count(&self) -> u64 {
        self.lost_count.load(Ordering::Relaxed)
    }

    pub fn add_lost(&self, records: usize) {
        self.lost_count.fetch_add(records as u64, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> WorkerMetricsSnapshot {
        WorkerMetricsSnapshot {
            queue_len: self.queue_len(),
            batch_count: self.batch_count(),
            record_count: self.record_count(),
            failed_count: self.failed_count(),
            structural_count: self.structural_count(),
            dropped_count: self.dropped_count(),
            lost_count: self.lost_count(),
        }
    }
}

/// Snapshot of worker counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerMetricsSnapshot {
    pub queue_len: usize,
    pub batch_count: u64,
    pub record_count: u64,
    pub failed_count: u64,
    pub structural_count: u64,
    pub dropped_count: u64,
    pub lost_count: u64,
}

impl std::ops::Add for WorkerMetricsSnapshot {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            queue_len: self.queue_len + other.queue_len,
            batch_count: self.batch_count + other.batch_count,
            record_count: self.record_count + other.record_count,
            failed_count: self.failed_count + other.failed_count,
            structural_count: self.structural_count + other.structural_count,
            dropped_count: self.dropped_count + other.dropped_count,
            lost_count: self.lost_count + other.lost_count,
        }
    }
}
