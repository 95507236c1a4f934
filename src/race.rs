//! Classification of filesystem failures that concurrent workers expect
//!
//! Workers never lock anything. Instead every mutating call is matched
//! against the small set of outcomes that peers can legitimately cause:
//! - the entry vanished (a peer removed it first)
//! - the entry already exists (a peer created it first)
//! - the directory is not empty (a peer has not cleared its share yet)
//!
//! Anything else is fatal and is propagated as [`crate::error::FsError`].

use std::io;

/// A benign outcome of two workers touching the same path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Race {
    /// ENOENT
    Vanished,
    /// EEXIST
    AlreadyExists,
    /// ENOTEMPTY
    NotEmpty,
}

/// Map an I/O error onto the expected-race set
///
/// Returns `None` for errors that are not races and must abort the run.
pub fn classify(err: &io::Error) -> Option<Race> {
    match err.kind() {
        io::ErrorKind::NotFound => Some(Race::Vanished),
        io::ErrorKind::AlreadyExists => Some(Race::AlreadyExists),
        io::ErrorKind::DirectoryNotEmpty => Some(Race::NotEmpty),
        _ => None,
    }
}

/// Classify the result of `rmdir`
///
/// POSIX allows `rmdir` on a non-empty directory to fail with EEXIST
/// instead of ENOTEMPTY, so both map to [`Race::NotEmpty`] here.
pub fn classify_rmdir(err: &io::Error) -> Option<Race> {
    match classify(err) {
        Some(Race::AlreadyExists) => Some(Race::NotEmpty),
        other => other,
    }
}
