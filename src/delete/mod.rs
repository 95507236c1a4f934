//! Parallel recursive deletion
//!
//! # Architecture
//!
//! ```text
//!                  ┌───────────────────────────┐
//!                  │     DeleteCoordinator     │
//!                  │  BottomUpDirs → RoundRobin│
//!                  └─────────────┬─────────────┘
//!          Work(dir) / EndOfWork │ one channel per worker
//!       ┌────────────────────────┼────────────────────────┐
//! ┌─────▼─────┐            ┌─────▼─────┐            ┌─────▼─────┐
//! │ Worker 0  │            │ Worker 1  │            │ Worker N  │
//! │ list      │            │ list      │            │ list      │
//! │ unlink    │            │ unlink    │            │ unlink    │
//! │ rmdir ↑   │            │ rmdir ↑   │            │ rmdir ↑   │
//! └───────────┘            └───────────┘            └───────────┘
//! ```
//!
//! Each directory is listed and emptied of non-directories by exactly one
//! worker. Workers only meet at shared ancestors during the upward rmdir
//! ascent, where the losers see "not empty" or "not found" and stop.

pub mod coordinator;
pub mod worker;

pub use coordinator::DeleteCoordinator;
pub use worker::{DeleteResult, DirDeleter};
