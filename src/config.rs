//! Configuration types for parfs
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Validated, immutable per-workflow configuration
//!
//! Everything here is checked before any worker is started; a failure is a
//! usage error, never a runtime one.

use crate::error::ConfigError;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum reasonable worker count
pub const MAX_WORKERS: usize = 512;

/// Default worker count when none is given
pub const DEFAULT_WORKERS: usize = 4;

/// Default backoff unit for directory-create collisions
pub const DEFAULT_COLLISION_BACKOFF_MS: u64 = 100;

/// Environment variable that turns on verbose trace mode
pub const TRACE_ENV_VAR: &str = "DEBUG";

/// Suffixes of compressed archives, which must be decompressed first
const COMPRESSED_SUFFIXES: &[&str] = &["gz", "tgz", "bz2", "tbz2", "xz", "txz", "zst", "Z"];

/// Parallel rm -rf and tar extraction
#[derive(Parser, Debug, Clone)]
#[command(
    name = "parfs",
    version,
    about = "Parallel recursive delete and tar extraction",
    long_about = "Deletes directory trees or extracts tar archives using a fixed pool of\n\
                  worker threads that coordinate only through message passing.\n\n\
                  Set DEBUG in the environment (or pass -v) for per-operation tracing.",
    after_help = "EXAMPLES:\n    \
        parfs rm /scratch/build-output\n    \
        parfs rm /scratch/build-output 16\n    \
        parfs untar linux-6.8.tar 8 -C /scratch/src"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose per-operation tracing (also enabled by DEBUG in the environment)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress header, progress and summary output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Recursively delete a directory tree in parallel
    Rm {
        /// Directory to delete
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,

        /// Number of worker threads
        #[arg(value_name = "THREAD_COUNT", default_value_t = DEFAULT_WORKERS)]
        thread_count: usize,
    },

    /// Extract an uncompressed tar archive in parallel
    Untar {
        /// Tar archive to extract
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Number of worker threads
        #[arg(value_name = "THREAD_COUNT", default_value_t = DEFAULT_WORKERS)]
        thread_count: usize,

        /// Directory to extract into
        #[arg(short = 'C', long, default_value = ".", value_name = "DIR")]
        directory: PathBuf,

        /// Backoff unit (multiplied by worker index) after a directory-create collision
        #[arg(long, hide = true, default_value_t = DEFAULT_COLLISION_BACKOFF_MS, value_name = "MS")]
        collision_backoff_ms: u64,
    },
}

/// Settings shared by both workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Number of workers in the pool
    pub worker_count: usize,

    /// Verbose per-operation trace events
    pub trace: bool,
}

impl RunOptions {
    pub fn new(worker_count: usize, trace: bool) -> Result<Self, ConfigError> {
        if worker_count == 0 || worker_count > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: worker_count,
                max: MAX_WORKERS,
            });
        }
        Ok(Self {
            worker_count,
            trace,
        })
    }
}

/// Validated configuration for the deletion workflow
#[derive(Debug, Clone)]
pub struct DeleteConfig {
    /// Absolute path of the tree to delete (removed itself at the end)
    pub root: PathBuf,

    pub options: RunOptions,
}

impl DeleteConfig {
    pub fn new(root: impl AsRef<Path>, options: RunOptions) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let not_dir = |reason: String| ConfigError::NotADirectory {
            path: root.to_path_buf(),
            reason,
        };

        let meta = std::fs::metadata(root).map_err(|e| not_dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(not_dir("only directories can be deleted".into()));
        }

        let root = std::path::absolute(root).map_err(|e| not_dir(e.to_string()))?;

        Ok(Self { root, options })
    }
}

/// Validated configuration for the extraction workflow
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Tar archive every worker re-reads from the start
    pub archive: PathBuf,

    /// Directory entries are materialized under
    pub destination: PathBuf,

    /// Backoff unit after a directory-create collision
    pub collision_backoff: Duration,

    pub options: RunOptions,
}

impl ExtractConfig {
    pub fn new(
        archive: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        options: RunOptions,
    ) -> Result<Self, ConfigError> {
        let archive = archive.as_ref();
        let destination = destination.as_ref();

        let meta = std::fs::metadata(archive).map_err(|_| ConfigError::ArchiveNotFound {
            path: archive.to_path_buf(),
        })?;
        if !meta.is_file() {
            return Err(ConfigError::NotAnArchive {
                path: archive.to_path_buf(),
                reason: "not a regular file".into(),
            });
        }

        if let Some(ext) = archive.extension().and_then(|e| e.to_str()) {
            if COMPRESSED_SUFFIXES.contains(&ext) {
                return Err(ConfigError::NotAnArchive {
                    path: archive.to_path_buf(),
                    reason: "compressed archives are not supported, decompress to .tar first"
                        .into(),
                });
            }
        }

        check_archive_header(archive)?;

        if destination.exists() && !destination.is_dir() {
            return Err(ConfigError::InvalidDestination {
                path: destination.to_path_buf(),
                reason: "exists and is not a directory".into(),
            });
        }

        Ok(Self {
            archive: archive.to_path_buf(),
            destination: destination.to_path_buf(),
            collision_backoff: Duration::from_millis(DEFAULT_COLLISION_BACKOFF_MS),
            options,
        })
    }

    /// Override the collision backoff unit
    pub fn with_collision_backoff(mut self, backoff: Duration) -> Self {
        self.collision_backoff = backoff;
        self
    }
}

/// Check that the first header of `path` decodes as tar
fn check_archive_header(path: &Path) -> Result<(), ConfigError> {
    let not_tar = |reason: String| ConfigError::NotAnArchive {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| not_tar(e.to_string()))?;
    let mut archive = tar::Archive::new(file);
    let mut entries = archive.entries().map_err(|e| not_tar(e.to_string()))?;

    match entries.next() {
        Some(Err(e)) => Err(not_tar(e.to_string())),
        _ => Ok(()),
    }
}

/// Whether verbose tracing was requested through the environment
pub fn trace_from_env() -> bool {
    std::env::var_os(TRACE_ENV_VAR).is_some()
}
