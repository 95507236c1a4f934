//! Parallel tar extraction
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │      ExtractCoordinator      │
//!                 │  spawn, barrier, collect     │
//!                 └──────────────┬───────────────┘
//!                                │
//!     ┌──────────────────────────┼──────────────────────────┐
//! ┌───▼────────┐           ┌─────▼──────┐            ┌──────▼─────┐
//! │ Worker 0   │           │ Worker 1   │            │ Worker N   │
//! │ full pass  │           │ full pass  │            │ full pass  │
//! │ owned dirs │           │ owned dirs │            │ owned dirs │
//! └───┬────────┘           └─────┬──────┘            └──────┬─────┘
//!     └──────── Ready ───────────┼──────── Ready ───────────┘
//!                         ┌──────▼──────┐
//!                         │ LinkBarrier │
//!                         └──────┬──────┘
//!                     deferred links, per worker
//! ```
//!
//! Every worker reads the whole archive. Directory entries are dealt out by
//! position (entry k belongs to worker k mod N) and a worker writes only the
//! entries whose parent directory it owns, so each entry is materialized
//! exactly once. Links whose target is not on disk yet wait until every
//! worker has finished its pass.

pub mod archive;
pub mod barrier;
pub mod coordinator;
pub mod worker;

pub use archive::{ArchiveSource, EntryKind, EntryRecord, TarArchive};
pub use barrier::LinkBarrier;
pub use coordinator::ExtractCoordinator;
pub use worker::{DeferredLink, ExtractResult, ExtractWorker};
