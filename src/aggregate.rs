//! Coordinator-side collection of per-worker counters
//!
//! Purely observational: a summary only exists once every worker has
//! returned its result, so aggregation can never hide a worker failure.

use std::ops::AddAssign;
use std::time::Duration;

/// Counters a worker returns when it finishes
pub trait WorkerCounters: Default + Clone + AddAssign + std::fmt::Debug {
    /// Files (or other non-directory entries) handled
    fn files(&self) -> u64;

    /// Directories handled
    fn dirs(&self) -> u64;

    /// Entries of any kind, for throughput
    fn entries(&self) -> u64 {
        self.files() + self.dirs()
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary<R> {
    /// Per-worker results, indexed by worker
    pub per_worker: Vec<R>,

    /// Sum over all workers
    pub totals: R,

    /// Wall-clock time from start to last worker joined
    pub elapsed: Duration,
}

impl<R: WorkerCounters> RunSummary<R> {
    pub fn new(per_worker: Vec<R>, elapsed: Duration) -> Self {
        let mut totals = R::default();
        for result in &per_worker {
            totals += result.clone();
        }
        Self {
            per_worker,
            totals,
            elapsed,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.per_worker.len()
    }

    /// Entries per second over the whole run
    pub fn entries_per_second(&self) -> f64 {
        rate(self.totals.entries(), self.elapsed)
    }

    pub fn files_per_second(&self) -> f64 {
        rate(self.totals.files(), self.elapsed)
    }

    pub fn dirs_per_second(&self) -> f64 {
        rate(self.totals.dirs(), self.elapsed)
    }
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}
