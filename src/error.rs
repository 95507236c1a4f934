//! Error types for parfs
//!
//! This module defines the error hierarchy used by both workflows:
//! - Configuration and CLI errors (raised before any worker starts)
//! - Fatal filesystem errors outside the enumerated race set
//! - Fatal archive errors (corrupt or unsafe input)
//! - Worker and coordination errors
//!
//! Expected races (vanished entries, collisions on create, non-empty
//! directories) are not errors at all; see [`crate::race`].

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for parfs
#[derive(Error, Debug)]
pub enum ToolError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fatal filesystem errors
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),

    /// Fatal archive errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors outside any worker (destination setup, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Usage errors: malformed arguments or a wrong target type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid thread count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Deletion target missing or not a directory
    #[error("Cannot delete '{path}': {reason}")]
    NotADirectory { path: PathBuf, reason: String },

    /// Extraction source missing
    #[error("Archive does not exist: '{path}'")]
    ArchiveNotFound { path: PathBuf },

    /// Extraction source is not an uncompressed tar archive
    #[error("Not a tar archive '{path}': {reason}")]
    NotAnArchive { path: PathBuf, reason: String },

    /// Extraction destination unusable
    #[error("Invalid destination '{path}': {reason}")]
    InvalidDestination { path: PathBuf, reason: String },
}

/// Filesystem operation that failed fatally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    ListDir,
    Unlink,
    RemoveDir,
    CreateDir,
    WriteFile,
    Symlink,
    HardLink,
}

impl std::fmt::Display for FsOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FsOp::ListDir => "list directory",
            FsOp::Unlink => "unlink",
            FsOp::RemoveDir => "remove directory",
            FsOp::CreateDir => "create directory",
            FsOp::WriteFile => "write file",
            FsOp::Symlink => "create symlink",
            FsOp::HardLink => "create hard link",
        };
        f.write_str(name)
    }
}

/// A filesystem failure outside the expected-race set
#[derive(Error, Debug)]
#[error("Failed to {op} '{path}': {source}")]
pub struct FsError {
    pub op: FsOp,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FsError {
    pub fn new(op: FsOp, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// The underlying `io::ErrorKind`
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

/// Corrupt, unreadable or unsafe archive input
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Failed to open the archive file
    #[error("Failed to open archive '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to decode an entry header or its payload
    #[error("Corrupt archive '{path}': {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Entry name escapes the extraction root
    #[error("Refusing unsafe entry name '{name}'")]
    UnsafePath { name: String },

    /// Link entry without a target
    #[error("Link entry '{name}' has no target")]
    MissingLinkTarget { name: String },
}

/// Worker thread and coordination errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker thread could not be spawned
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker hit a fatal error and reported it
    #[error("Worker {id} failed: {source}")]
    Failed {
        id: usize,
        #[source]
        source: Box<ToolError>,
    },

    /// Worker exited without sending its final report
    #[error("Worker {id} exited without reporting a result")]
    MissingReport { id: usize },

    /// Barrier release never came because a peer failed
    #[error("Worker {id} abandoned at link barrier: a peer worker failed")]
    BarrierAbandoned { id: usize },

    /// Coordinator dropped the work channel before end-of-work
    #[error("Worker {id} lost its coordinator before end of work")]
    CoordinatorGone { id: usize },
}

impl WorkerError {
    /// True for errors that only exist because some other worker failed
    ///
    /// The coordinator reports the originating failure in preference to these.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            WorkerError::BarrierAbandoned { .. } | WorkerError::CoordinatorGone { .. }
        )
    }

    /// Index of the worker this error belongs to
    pub fn worker_id(&self) -> usize {
        match self {
            WorkerError::InitFailed { id, .. }
            | WorkerError::Panicked { id, .. }
            | WorkerError::Failed { id, .. }
            | WorkerError::MissingReport { id }
            | WorkerError::BarrierAbandoned { id }
            | WorkerError::CoordinatorGone { id } => *id,
        }
    }
}

/// Result type alias for ToolError
pub type Result<T> = std::result::Result<T, ToolError>;

/// Pick the error that caused a failed run out of every worker's failure
///
/// Derived errors (barrier abandoned, coordinator gone) are only returned
/// when nothing else is available.
pub fn primary_failure(mut errors: Vec<WorkerError>) -> Option<WorkerError> {
    if let Some(idx) = errors.iter().position(|e| !e.is_derived()) {
        return Some(errors.swap_remove(idx));
    }
    if errors.is_empty() {
        None
    } else {
        Some(errors.swap_remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_errors() {
        assert!(WorkerError::BarrierAbandoned { id: 1 }.is_derived());
        assert!(WorkerError::CoordinatorGone { id: 1 }.is_derived());
        assert!(!WorkerError::MissingReport { id: 1 }.is_derived());
    }

    #[test]
    fn test_primary_failure_prefers_origin() {
        let origin = WorkerError::Failed {
            id: 2,
            source: Box::new(ToolError::Fs(FsError::new(
                FsOp::Unlink,
                "/x",
                io::Error::from(io::ErrorKind::PermissionDenied),
            ))),
        };
        let errors = vec![
            WorkerError::BarrierAbandoned { id: 0 },
            origin,
            WorkerError::BarrierAbandoned { id: 1 },
        ];

        let primary = primary_failure(errors).unwrap();
        assert_eq!(primary.worker_id(), 2);
        assert!(!primary.is_derived());
    }

    #[test]
    fn test_primary_failure_falls_back_to_derived() {
        let errors = vec![WorkerError::CoordinatorGone { id: 3 }];
        assert_eq!(primary_failure(errors).unwrap().worker_id(), 3);
        assert!(primary_failure(Vec::new()).is_none());
    }

    #[test]
    fn test_error_conversion() {
        let fs_err = FsError::new(
            FsOp::RemoveDir,
            "/missing",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(fs_err.kind(), io::ErrorKind::PermissionDenied);
        let tool_err: ToolError = fs_err.into();
        assert!(matches!(tool_err, ToolError::Fs(_)));
        assert!(tool_err.to_string().contains("remove directory"));
    }
}
