//! Work partitioning rules
//!
//! Two schemes, one per workflow:
//! - [`RoundRobin`]: the deletion coordinator deals directories out in
//!   stream order, item `i` to worker `i mod N`.
//! - [`DirOwnership`]: extraction workers never receive work; each one
//!   replays the same archive stream and decides ownership locally from a
//!   counter over directory entries, so all workers agree without talking.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Round-robin dealer over `worker_count` workers
#[derive(Debug, Clone)]
pub struct RoundRobin {
    worker_count: usize,
    next: usize,
}

impl RoundRobin {
    pub fn new(worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be positive");
        Self {
            worker_count,
            next: 0,
        }
    }

    /// Worker index for the next item
    pub fn assign(&mut self) -> usize {
        let idx = self.next;
        self.next += 1;
        if self.next >= self.worker_count {
            self.next = 0;
        }
        idx
    }
}

/// Per-worker directory ownership counter
///
/// The counter starts one step behind zero and advances on every directory
/// entry in the stream, whoever owns it. Directory entry `k` (0-based) is
/// therefore owned by worker `k mod N` in every worker's replay.
#[derive(Debug, Clone)]
pub struct DirOwnership {
    worker_index: usize,
    worker_count: usize,
    counter: usize,
}

impl DirOwnership {
    pub fn new(worker_index: usize, worker_count: usize) -> Self {
        assert!(
            worker_index < worker_count,
            "worker_index {} out of range for {} workers",
            worker_index,
            worker_count
        );
        Self {
            worker_index,
            worker_count,
            counter: worker_count - 1,
        }
    }

    /// Advance past one directory entry and report whether this worker owns it
    pub fn next_dir(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.worker_count {
            self.counter = 0;
        }
        self.counter == self.worker_index
    }

    /// Deterministic owner of entries whose parent has no directory entry
    pub fn orphan_owner(&self, parent: &Path) -> usize {
        stable_index(parent, self.worker_count)
    }

    pub fn worker_index(&self) -> usize {
        self.worker_index
    }
}

/// Same value for the same path in every worker of this process
fn stable_index(path: &Path, buckets: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    (hasher.finish() % buckets as u64) as usize
}
