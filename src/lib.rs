//! parfs - Parallel Recursive Delete and Tar Extraction
//!
//! Two filesystem tools built on one execution model: a fixed pool of OS
//! worker threads that share no mutable state and coordinate only by
//! message passing.
//!
//! # Features
//!
//! - **Parallel rm -rf**: A bottom-up walk deals directories round-robin to
//!   workers, which empty them and collapse emptied ancestors upward.
//!   Races between workers are expected and tolerated.
//!
//! - **Parallel untar**: Every worker replays the archive and materializes
//!   only the entries whose parent directory it owns. Links wait behind a
//!   barrier until every worker has finished its pass.
//!
//! - **All-or-nothing runs**: Any worker error fails the whole run with a
//!   nonzero exit; there is no partial success.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Coordinator                              │
//! │   rm:    BottomUpDirs ──► RoundRobin ──► Work(dir) / EndOfWork   │
//! │   untar: spawn ──► wait for Ready ──► release / abandon barrier  │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ crossbeam channels
//!       ┌───────────────────────┼───────────────────────┐
//!  ┌────▼────┐             ┌────▼────┐             ┌────▼────┐
//!  │Worker 0 │             │Worker 1 │    ...      │Worker N │
//!  └────┬────┘             └────┬────┘             └────┬────┘
//!       │ Finished / Failed     │                       │
//!       └───────────────────────┼───────────────────────┘
//!                               ▼
//!                     ┌──────────────────┐
//!                     │   RunSummary     │
//!                     │ totals, per-     │
//!                     │ worker, elapsed  │
//!                     └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Delete a tree with 16 workers
//! parfs rm /scratch/build-output 16
//!
//! # Extract into a directory with 8 workers and per-operation tracing
//! DEBUG=1 parfs untar linux-6.8.tar 8 -C /scratch/src
//! ```

pub mod aggregate;
pub mod config;
pub mod delete;
pub mod error;
pub mod extract;
pub mod message;
pub mod partition;
pub mod progress;
pub mod race;
pub mod walker;
pub mod worker;

pub use aggregate::{RunSummary, WorkerCounters};
pub use config::{CliArgs, Command, DeleteConfig, ExtractConfig, RunOptions};
pub use delete::{DeleteCoordinator, DeleteResult};
pub use error::{Result, ToolError};
pub use extract::{ExtractCoordinator, ExtractResult};
