//! Extraction coordinator
//!
//! The coordinator hands out no work at all: every worker replays the
//! archive on its own. It is responsible for:
//! - Preparing the destination and spawning the workers
//! - Running the link barrier (all `Ready`, then one release)
//! - Abandoning the barrier if any worker fails before arriving
//! - Collecting final reports and building the run summary

use crate::aggregate::RunSummary;
use crate::config::ExtractConfig;
use crate::error::{primary_failure, Result, WorkerError};
use crate::extract::archive::{ArchiveSource, TarArchive};
use crate::extract::barrier::LinkBarrier;
use crate::extract::worker::{self, ExtractResult};
use crate::message::WorkerReport;
use crate::worker::WorkerThread;
use crossbeam_channel::{unbounded, Receiver};
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Where a worker stands from the coordinator's point of view
enum Standing {
    /// No report consumed yet
    Running,
    /// Sent `Ready`
    AtBarrier,
    /// Terminal report consumed
    Done(std::result::Result<ExtractResult, WorkerError>),
}

/// Coordinates a parallel tar extraction
pub struct ExtractCoordinator {
    config: Arc<ExtractConfig>,
    source: Arc<dyn ArchiveSource>,
}

impl ExtractCoordinator {
    pub fn new(config: ExtractConfig) -> Self {
        let source = Arc::new(TarArchive::new(config.archive.clone()));
        Self::with_source(config, source)
    }

    /// Use a custom entry source instead of the configured tar file
    pub fn with_source(config: ExtractConfig, source: Arc<dyn ArchiveSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
        }
    }

    /// Extract the archive into the configured destination
    pub fn run(self) -> Result<RunSummary<ExtractResult>> {
        let start = Instant::now();
        let worker_count = self.config.options.worker_count;

        info!(
            archive = %self.config.archive.display(),
            destination = %self.config.destination.display(),
            workers = worker_count,
            "Starting parallel extract"
        );

        fs::create_dir_all(&self.config.destination)?;

        let barrier = LinkBarrier::new(worker_count);
        let mut reports: Vec<Receiver<WorkerReport<ExtractResult>>> = Vec::new();
        let mut workers: Vec<WorkerThread> = Vec::new();

        for id in 0..worker_count {
            let (report_tx, report_rx) = unbounded();
            let spawned = worker::spawn(
                id,
                Arc::clone(&self.config),
                Arc::clone(&self.source),
                barrier.gate(id),
                report_tx,
            );
            match spawned {
                Ok(thread) => {
                    reports.push(report_rx);
                    workers.push(thread);
                }
                Err(e) => {
                    barrier.abandon();
                    for thread in workers {
                        let _ = thread.join();
                    }
                    return Err(e.into());
                }
            }
        }
        info!(count = workers.len(), "Workers spawned");

        let mut standings: Vec<Standing> = (0..worker_count).map(|_| Standing::Running).collect();
        let all_ready = await_arrivals(&reports, &mut standings);

        if all_ready {
            info!(
                elapsed_secs = start.elapsed().as_secs_f64(),
                "Reached link barrier"
            );
            barrier.release();
        } else {
            warn!("A worker failed before the link barrier, abandoning run");
            barrier.abandon();
        }

        let mut results = Vec::with_capacity(worker_count);
        let mut failures = Vec::new();
        for ((rx, thread), standing) in reports.iter().zip(workers).zip(standings) {
            let id = thread.id();
            let outcome = match standing {
                Standing::Done(outcome) => outcome,
                Standing::Running | Standing::AtBarrier => final_report(id, rx),
            };
            let joined = thread.join();

            match (outcome, joined) {
                (Ok(result), Ok(())) => results.push(result),
                (Err(WorkerError::MissingReport { .. }), Err(panic)) => failures.push(panic),
                (Err(e), _) | (Ok(_), Err(e)) => failures.push(e),
            }
        }

        if let Some(e) = primary_failure(failures) {
            return Err(e.into());
        }

        let summary = RunSummary::new(results, start.elapsed());
        info!(
            files = summary.totals.files_extracted,
            dirs = summary.totals.dirs_extracted,
            duration_secs = summary.elapsed.as_secs_f64(),
            "Extract completed"
        );
        Ok(summary)
    }
}

/// Wait for every worker's `Ready`, stopping at the first failure
fn await_arrivals(
    reports: &[Receiver<WorkerReport<ExtractResult>>],
    standings: &mut [Standing],
) -> bool {
    for (id, rx) in reports.iter().enumerate() {
        match rx.recv() {
            Ok(WorkerReport::Ready { .. }) => standings[id] = Standing::AtBarrier,
            Ok(WorkerReport::Failed { error, .. }) => {
                standings[id] = Standing::Done(Err(error));
                return false;
            }
            Ok(WorkerReport::Finished { .. }) | Err(_) => {
                standings[id] = Standing::Done(Err(WorkerError::MissingReport { id }));
                return false;
            }
        }
    }
    true
}

/// Read reports until a terminal one arrives
fn final_report(
    id: usize,
    rx: &Receiver<WorkerReport<ExtractResult>>,
) -> std::result::Result<ExtractResult, WorkerError> {
    loop {
        match rx.recv() {
            Ok(WorkerReport::Ready { .. }) => continue,
            Ok(WorkerReport::Finished { result, .. }) => return Ok(result),
            Ok(WorkerReport::Failed { error, .. }) => return Err(error),
            Err(_) => return Err(WorkerError::MissingReport { id }),
        }
    }
}
