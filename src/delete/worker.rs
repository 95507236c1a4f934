//! Deletion worker
//!
//! Each worker:
//! - Receives directories from its own channel, children before parents
//! - Unlinks every non-directory entry of each directory it receives
//! - Removes the directory and then as many ancestors as it can
//! - Returns its counters over the report channel at end of work

use crate::aggregate::WorkerCounters;
use crate::config::DeleteConfig;
use crate::error::{FsError, FsOp, Result, WorkerError};
use crate::message::{WorkerEndpoint, WorkerMessage, WorkerReport};
use crate::race::{classify, classify_rmdir, Race};
use crate::worker::WorkerThread;
use std::fs;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters collected by a deletion worker
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    /// Non-directory entries unlinked
    pub files_removed: u64,

    /// Directories removed (including ancestors removed on the way up)
    pub dirs_removed: u64,

    /// Paths a peer removed first
    pub collisions: u64,

    /// Ascents stopped at a directory a peer has not emptied yet
    pub nonempty_defers: u64,
}

impl AddAssign for DeleteResult {
    fn add_assign(&mut self, rhs: Self) {
        self.files_removed += rhs.files_removed;
        self.dirs_removed += rhs.dirs_removed;
        self.collisions += rhs.collisions;
        self.nonempty_defers += rhs.nonempty_defers;
    }
}

impl WorkerCounters for DeleteResult {
    fn files(&self) -> u64 {
        self.files_removed
    }

    fn dirs(&self) -> u64 {
        self.dirs_removed
    }
}

/// Race-tolerant deletion of single directories under a fixed root
///
/// Holds the worker's counters; configuration is borrowed and never changes.
pub struct DirDeleter<'a> {
    id: usize,
    root: &'a Path,
    trace: bool,
    result: DeleteResult,
}

impl<'a> DirDeleter<'a> {
    pub fn new(id: usize, root: &'a Path, trace: bool) -> Self {
        Self {
            id,
            root,
            trace,
            result: DeleteResult::default(),
        }
    }

    /// Empty `dir` of non-directories, then collapse it and its ancestors
    pub fn delete_dir(&mut self, dir: &Path) -> std::result::Result<(), FsError> {
        if self.trace {
            debug!(worker = self.id, dir = %dir.display(), "Deleting directory");
        }

        let entries = match list_entries(dir) {
            Ok(entries) => entries,
            Err(e) if classify(&e.source) == Some(Race::Vanished) => {
                self.result.collisions += 1;
                if self.trace {
                    debug!(worker = self.id, dir = %dir.display(), "Directory already gone");
                }
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for path in entries {
            self.unlink(&path)?;
        }

        self.collapse(dir)
    }

    fn unlink(&mut self, path: &Path) -> std::result::Result<(), FsError> {
        if self.trace {
            debug!(worker = self.id, path = %path.display(), "Unlinking");
        }

        match fs::remove_file(path) {
            Ok(()) => {
                self.result.files_removed += 1;
                Ok(())
            }
            Err(e) if classify(&e) == Some(Race::Vanished) => {
                self.result.collisions += 1;
                Ok(())
            }
            Err(e) => Err(FsError::new(FsOp::Unlink, path, e)),
        }
    }

    /// Remove `dir`, then its parent, and so on up to the root
    fn collapse(&mut self, dir: &Path) -> std::result::Result<(), FsError> {
        let mut candidate = Some(dir);

        while let Some(current) = candidate {
            if !current.starts_with(self.root) {
                break;
            }

            match fs::remove_dir(current) {
                Ok(()) => {
                    self.result.dirs_removed += 1;
                    if self.trace {
                        debug!(worker = self.id, dir = %current.display(), "Removed directory");
                    }
                }
                Err(e) => match classify_rmdir(&e) {
                    Some(Race::NotEmpty) => {
                        self.result.nonempty_defers += 1;
                        break;
                    }
                    Some(Race::Vanished) => {
                        self.result.collisions += 1;
                        break;
                    }
                    _ => return Err(FsError::new(FsOp::RemoveDir, current, e)),
                },
            }

            candidate = current.parent();
        }

        Ok(())
    }

    pub fn result(&self) -> DeleteResult {
        self.result
    }
}

/// Direct entries of `dir` that are not real directories
///
/// Symlinks to directories are returned: they are unlinked, never followed.
fn list_entries(dir: &Path) -> std::result::Result<Vec<PathBuf>, FsError> {
    let read_dir = fs::read_dir(dir).map_err(|e| FsError::new(FsOp::ListDir, dir, e))?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| FsError::new(FsOp::ListDir, dir, e))?;
        let is_dir = match entry.file_type() {
            Ok(ft) => ft.is_dir(),
            // Vanished between readdir and lstat: the unlink will count it.
            Err(e) if classify(&e) == Some(Race::Vanished) => false,
            Err(e) => return Err(FsError::new(FsOp::ListDir, entry.path(), e)),
        };
        if !is_dir {
            entries.push(entry.path());
        }
    }
    Ok(entries)
}

/// Spawn a deletion worker on its own thread
pub fn spawn(
    id: usize,
    config: Arc<DeleteConfig>,
    endpoint: WorkerEndpoint<PathBuf, DeleteResult>,
) -> std::result::Result<WorkerThread, WorkerError> {
    WorkerThread::spawn(id, "rm", move || worker_loop(id, &config, endpoint))
}

fn worker_loop(id: usize, config: &DeleteConfig, endpoint: WorkerEndpoint<PathBuf, DeleteResult>) {
    let report = match run(id, config, &endpoint) {
        Ok(result) => {
            info!(
                worker = id,
                files = result.files_removed,
                dirs = result.dirs_removed,
                collisions = result.collisions,
                nonempty = result.nonempty_defers,
                "Worker finished"
            );
            WorkerReport::Finished { worker: id, result }
        }
        Err(e) => WorkerReport::failed(id, e),
    };

    // A closed report channel means the coordinator is gone; nobody to tell.
    let _ = endpoint.report_tx.send(report);
}

fn run(
    id: usize,
    config: &DeleteConfig,
    endpoint: &WorkerEndpoint<PathBuf, DeleteResult>,
) -> Result<DeleteResult> {
    let mut deleter = DirDeleter::new(id, &config.root, config.options.trace);

    loop {
        match endpoint.work_rx.recv() {
            Ok(WorkerMessage::Work(dir)) => deleter.delete_dir(&dir)?,
            Ok(WorkerMessage::EndOfWork) => break,
            Err(_) => return Err(WorkerError::CoordinatorGone { id }.into()),
        }
    }

    Ok(deleter.result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::BottomUpDirs;
    use tempfile::tempdir;

    #[test]
    fn test_empty_root_single_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();

        let mut deleter = DirDeleter::new(0, &root, false);
        deleter.delete_dir(&root).unwrap();

        assert!(!root.exists());
        assert!(dir.path().exists());
        assert_eq!(
            deleter.result(),
            DeleteResult {
                dirs_removed: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_ascent_stops_at_nonempty_parent() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("a/f1"), b"1").unwrap();
        fs::write(root.join("keep"), b"k").unwrap();

        let mut deleter = DirDeleter::new(0, &root, false);
        deleter.delete_dir(&root.join("a")).unwrap();

        assert!(!root.join("a").exists());
        assert!(root.join("keep").exists());
        let result = deleter.result();
        assert_eq!(result.files_removed, 1);
        assert_eq!(result.dirs_removed, 1);
        assert_eq!(result.nonempty_defers, 1);
    }

    #[test]
    fn test_vanished_directory_counts_collision() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();

        let mut deleter = DirDeleter::new(0, &root, true);
        deleter.delete_dir(&root.join("gone")).unwrap();

        assert_eq!(deleter.result().collisions, 1);
        assert!(root.exists());
    }

    #[test]
    fn test_ascent_collapses_emptied_ancestors() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("a/b/c/leaf"), b"x").unwrap();

        // Only the leaf is handed out; its ascent must take every empty ancestor.
        let mut deleter = DirDeleter::new(0, &root, false);
        deleter.delete_dir(&root.join("a/b/c")).unwrap();

        assert!(!root.exists());
        assert_eq!(deleter.result().dirs_removed, 4);
        assert_eq!(deleter.result().files_removed, 1);
    }

    #[test]
    fn test_second_ascent_sees_collision() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("a")).unwrap();

        let mut first = DirDeleter::new(0, &root, false);
        first.delete_dir(&root.join("a")).unwrap();
        assert!(!root.exists());

        let mut second = DirDeleter::new(1, &root, false);
        second.delete_dir(&root).unwrap();
        assert_eq!(second.result().collisions, 1);
        assert_eq!(second.result().dirs_removed, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_dir_symlink_is_unlinked_not_followed() {
        let dir = tempdir().unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("precious"), b"p").unwrap();

        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        let mut deleter = DirDeleter::new(0, &root, false);
        for d in BottomUpDirs::new(&root) {
            deleter.delete_dir(&d.unwrap()).unwrap();
        }

        assert!(!root.exists());
        assert!(outside.join("precious").exists());
        assert_eq!(deleter.result().files_removed, 1);
    }

    #[test]
    fn test_sequential_walk_removes_everything() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        for sub in ["a/b/c", "a/b/d", "a/e", "f"] {
            fs::create_dir_all(root.join(sub)).unwrap();
            fs::write(root.join(sub).join("data"), b"d").unwrap();
        }

        let mut deleter = DirDeleter::new(0, &root, false);
        for d in BottomUpDirs::new(&root) {
            deleter.delete_dir(&d.unwrap()).unwrap();
        }

        assert!(!root.exists());
        assert_eq!(deleter.result().files_removed, 4);
        assert_eq!(deleter.result().dirs_removed, 7);
    }
}
