//! Typed messages exchanged between the coordinator and its workers
//!
//! Each worker owns one bidirectional link made of two crossbeam channels:
//! work flows down as [`WorkerMessage`], reports flow up as [`WorkerReport`].
//! End of work is its own variant, so no path value is ever reserved.

use crate::error::{ToolError, WorkerError};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

/// Coordinator to worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage<T> {
    /// One unit of work
    Work(T),

    /// No further work will be sent
    EndOfWork,
}

/// Worker to coordinator
#[derive(Debug)]
pub enum WorkerReport<R> {
    /// Phase one finished, waiting at the barrier
    Ready { worker: usize },

    /// Worker finished and returns its counters
    Finished { worker: usize, result: R },

    /// Worker hit a fatal error and is terminating
    Failed { worker: usize, error: WorkerError },
}

impl<R> WorkerReport<R> {
    pub fn worker(&self) -> usize {
        match self {
            WorkerReport::Ready { worker }
            | WorkerReport::Finished { worker, .. }
            | WorkerReport::Failed { worker, .. } => *worker,
        }
    }

    /// Build the failure report for a worker error
    pub fn failed(worker: usize, error: ToolError) -> Self {
        let error = match error {
            ToolError::Worker(e) => e,
            other => WorkerError::Failed {
                id: worker,
                source: Box::new(other),
            },
        };
        WorkerReport::Failed { worker, error }
    }
}

/// Worker-side ends of a link
pub struct WorkerEndpoint<T, R> {
    pub work_rx: Receiver<WorkerMessage<T>>,
    pub report_tx: Sender<WorkerReport<R>>,
}

/// Coordinator-side ends of a link
pub struct CoordinatorEndpoint<T, R> {
    pub work_tx: Sender<WorkerMessage<T>>,
    pub report_rx: Receiver<WorkerReport<R>>,
}

/// Create one coordinator/worker link
///
/// `capacity` bounds the work direction. Reports are few per worker, so
/// that direction is unbounded.
pub fn link<T, R>(capacity: usize) -> (CoordinatorEndpoint<T, R>, WorkerEndpoint<T, R>) {
    let (work_tx, work_rx) = bounded(capacity);
    let (report_tx, report_rx) = unbounded();

    (
        CoordinatorEndpoint { work_tx, report_rx },
        WorkerEndpoint { work_rx, report_tx },
    )
}
