//! Deletion coordinator
//!
//! The coordinator is responsible for:
//! - Spawning the worker pool and one link per worker
//! - Draining the bottom-up walk and dealing directories round-robin
//! - Sending end-of-work and collecting every worker's final report
//! - Turning any worker failure into a run-wide failure

use crate::aggregate::RunSummary;
use crate::config::DeleteConfig;
use crate::delete::worker::{self, DeleteResult};
use crate::error::{primary_failure, Result, ToolError, WorkerError};
use crate::message::{link, CoordinatorEndpoint, WorkerMessage, WorkerReport};
use crate::partition::RoundRobin;
use crate::walker::BottomUpDirs;
use crate::worker::WorkerThread;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Directories buffered per worker before the coordinator blocks
const WORK_QUEUE_DEPTH: usize = 1024;

/// Coordinates a parallel recursive delete
pub struct DeleteCoordinator {
    config: Arc<DeleteConfig>,
}

impl DeleteCoordinator {
    pub fn new(config: DeleteConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Delete the configured tree, root included
    pub fn run(self) -> Result<RunSummary<DeleteResult>> {
        let start = Instant::now();
        let worker_count = self.config.options.worker_count;

        info!(
            root = %self.config.root.display(),
            workers = worker_count,
            "Starting parallel delete"
        );

        let (links, workers) = self.spawn_workers()?;

        let mut early: Vec<Option<WorkerReport<DeleteResult>>> =
            (0..links.len()).map(|_| None).collect();
        let dispatch_error = self.dispatch(&links, &mut early);

        info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Directory list constructed, awaiting workers"
        );

        for link in &links {
            // A dead worker has already dropped its receiver; its report says why.
            let _ = link.work_tx.send(WorkerMessage::EndOfWork);
        }

        let mut results = Vec::with_capacity(worker_count);
        let mut failures = Vec::new();
        for ((link, thread), report) in links.into_iter().zip(workers).zip(early) {
            match collect(link, thread, report) {
                Ok(result) => results.push(result),
                Err(e) => failures.push(e),
            }
        }

        if let Some(e) = dispatch_error {
            return Err(e);
        }
        if let Some(e) = primary_failure(failures) {
            return Err(e.into());
        }

        let summary = RunSummary::new(results, start.elapsed());
        info!(
            files = summary.totals.files_removed,
            dirs = summary.totals.dirs_removed,
            duration_secs = summary.elapsed.as_secs_f64(),
            "Delete completed"
        );
        Ok(summary)
    }

    /// Spawn worker threads, each with its own link
    fn spawn_workers(
        &self,
    ) -> Result<(
        Vec<CoordinatorEndpoint<PathBuf, DeleteResult>>,
        Vec<WorkerThread>,
    )> {
        let mut links = Vec::new();
        let mut workers = Vec::new();

        for id in 0..self.config.options.worker_count {
            let (coordinator_end, worker_end) = link(WORK_QUEUE_DEPTH);
            match worker::spawn(id, Arc::clone(&self.config), worker_end) {
                Ok(thread) => {
                    links.push(coordinator_end);
                    workers.push(thread);
                }
                Err(e) => {
                    // Dropping the links tells the spawned workers to stop.
                    drop(links);
                    for thread in workers {
                        let _ = thread.join();
                    }
                    return Err(e.into());
                }
            }
        }

        info!(count = workers.len(), "Workers spawned");
        Ok((links, workers))
    }

    /// Deal the walk out round-robin until it ends or a worker is lost
    ///
    /// Reports that arrive during dispatch are kept in `early` for collection.
    fn dispatch(
        &self,
        links: &[CoordinatorEndpoint<PathBuf, DeleteResult>],
        early: &mut [Option<WorkerReport<DeleteResult>>],
    ) -> Option<ToolError> {
        let mut dealer = RoundRobin::new(links.len());

        for item in BottomUpDirs::new(&self.config.root) {
            if let Some(idx) = poll_failures(links, early) {
                warn!(worker = idx, "Worker reported failure, halting dispatch");
                return None;
            }

            let dir = match item {
                Ok(dir) => dir,
                Err(e) => return Some(e.into()),
            };

            let idx = dealer.assign();
            if links[idx].work_tx.send(WorkerMessage::Work(dir)).is_err() {
                warn!(worker = idx, "Worker stopped accepting work, halting dispatch");
                return None;
            }
        }

        None
    }
}

/// Pick up any report sent before end of work; returns the first failed worker
fn poll_failures(
    links: &[CoordinatorEndpoint<PathBuf, DeleteResult>],
    early: &mut [Option<WorkerReport<DeleteResult>>],
) -> Option<usize> {
    for (idx, (link, slot)) in links.iter().zip(early.iter_mut()).enumerate() {
        if slot.is_none() {
            *slot = link.report_rx.try_recv().ok();
        }
        if let Some(WorkerReport::Failed { .. }) = slot {
            return Some(idx);
        }
    }
    None
}

/// Wait for one worker's final report, then its thread
fn collect(
    link: CoordinatorEndpoint<PathBuf, DeleteResult>,
    thread: WorkerThread,
    early: Option<WorkerReport<DeleteResult>>,
) -> std::result::Result<DeleteResult, WorkerError> {
    let id = thread.id();
    let report = match early {
        Some(report) => Ok(report),
        None => link.report_rx.recv(),
    };
    let joined = thread.join();

    match report {
        Ok(WorkerReport::Finished { result, .. }) => joined.map(|()| result),
        Ok(WorkerReport::Failed { error, .. }) => Err(error),
        Ok(WorkerReport::Ready { .. }) | Err(_) => {
            Err(joined.err().unwrap_or(WorkerError::MissingReport { id }))
        }
    }
}
