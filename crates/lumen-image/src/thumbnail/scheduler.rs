//! Global cap on concurrently running thumbnail workers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Worker cap for a machine with `cores` logical CPUs: one less than the
/// core count, but never below two.
pub fn worker_cap(cores: usize) -> usize {
    cores.saturating_sub(1).max(2)
}

/// Counts running thumbnail workers against a fixed capacity.
///
/// One instance is created per viewer and shared by `Arc` with every
/// request site.
#[derive(Debug)]
pub struct ThumbnailScheduler {
    capacity: usize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ThumbnailScheduler {
    /// Scheduler sized for this machine.
    pub fn new() -> Self {
        Self::with_capacity(worker_cap(num_cpus::get()))
    }

    /// Scheduler with an explicit capacity (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Workers currently holding a slot.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Highest number of simultaneously held slots observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Take a slot if one is free.
    pub fn try_acquire(self: &Arc<Self>) -> Option<WorkerPermit> {
        let mut current = self.running.load(Ordering::Acquire);
        loop {
            if current >= self.capacity {
                return None;
            }
            match self.running.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.peak.fetch_max(current + 1, Ordering::AcqRel);
                    return Some(WorkerPermit {
                        scheduler: Arc::clone(self),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for ThumbnailScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A held worker slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct WorkerPermit {
    scheduler: Arc<ThumbnailScheduler>,
}

impl Drop for WorkerPermit {
    fn drop(&mut self) {
        let previous = self.scheduler.running.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "worker permit released twice");
    }
}

// ── Tests ───────────────────────────────────────────────────────
