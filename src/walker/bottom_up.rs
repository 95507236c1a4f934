//! Lazy post-order directory iterator
//!
//! A thin layer over `walkdir` in contents-first mode. Directories are
//! read as the walk reaches them, so the sequence can be consumed one path
//! at a time by the coordinator. Symlinks are never followed, even when
//! they point at directories: they are plain entries for whoever lists
//! their parent.

use crate::error::{FsError, FsOp};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Iterator over the directories of a tree, children before parents
///
/// Finite and not restartable. After yielding an error it yields nothing more.
pub struct BottomUpDirs {
    root: PathBuf,
    inner: walkdir::IntoIter,
    done: bool,
}

impl BottomUpDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let inner = WalkDir::new(&root)
            .follow_links(false)
            .contents_first(true)
            .into_iter();
        Self {
            root,
            inner,
            done: false,
        }
    }
}

impl Iterator for BottomUpDirs {
    type Item = Result<PathBuf, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.inner.next()? {
                Ok(entry) if entry.file_type().is_dir() => return Some(Ok(entry.into_path())),
                Ok(_) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(list_error(&self.root, e)));
                }
            }
        }
    }
}

fn list_error(root: &Path, err: walkdir::Error) -> FsError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop"));
    FsError::new(FsOp::ListDir, path, source)
}
