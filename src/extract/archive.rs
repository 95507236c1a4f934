//! Archive entry stream
//!
//! Every extraction worker replays the whole archive from the start and
//! sees the same entries in the same order. The stream hands each entry to
//! a visitor together with a handle that can materialize that one entry;
//! decoding and payload writing stay inside the `tar` crate.

use crate::error::{ArchiveError, Result};
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// Kind of an archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Dir,
    File,
    Symlink,
    HardLink,
    /// Devices, fifos and other types the library materializes as it can
    Special,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        self == EntryKind::Dir
    }

    pub fn is_link(self) -> bool {
        matches!(self, EntryKind::Symlink | EntryKind::HardLink)
    }

    fn from_tar(kind: tar::EntryType) -> Option<Self> {
        if kind.is_pax_global_extensions()
            || kind.is_pax_local_extensions()
            || kind.is_gnu_longname()
            || kind.is_gnu_longlink()
        {
            return None;
        }

        Some(if kind.is_dir() {
            EntryKind::Dir
        } else if kind.is_symlink() {
            EntryKind::Symlink
        } else if kind.is_hard_link() {
            EntryKind::HardLink
        } else if kind.is_file() || kind.is_contiguous() || kind.is_gnu_sparse() {
            EntryKind::File
        } else {
            EntryKind::Special
        })
    }
}

/// Decoded metadata of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Normalized relative name, without leading `/`, `./` or trailing `/`
    pub name: PathBuf,

    pub kind: EntryKind,

    /// Symlink target as stored, or hardlink target as a normalized member name
    pub link_target: Option<PathBuf>,

    /// Payload size in bytes
    pub size: u64,
}

impl EntryRecord {
    /// Parent directory name; empty for top-level entries
    pub fn parent(&self) -> &Path {
        self.name.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Writes the payload of the entry currently being visited
pub trait EntryPayload {
    fn unpack(&mut self, dst: &Path) -> io::Result<()>;
}

impl<R: Read> EntryPayload for tar::Entry<'_, R> {
    fn unpack(&mut self, dst: &Path) -> io::Result<()> {
        tar::Entry::unpack(self, dst).map(|_| ())
    }
}

/// A replayable, ordered source of archive entries
///
/// Contract: a directory's entry precedes the entries of its contents, and
/// every call to `visit` yields the same entries in the same order.
pub trait ArchiveSource: Send + Sync {
    fn visit(
        &self,
        visitor: &mut dyn FnMut(&EntryRecord, &mut dyn EntryPayload) -> Result<()>,
    ) -> Result<()>;
}

/// Uncompressed tar file on disk
#[derive(Debug, Clone)]
pub struct TarArchive {
    path: PathBuf,
}

impl TarArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, source: io::Error) -> ArchiveError {
        ArchiveError::Corrupt {
            path: self.path.clone(),
            source,
        }
    }
}

impl ArchiveSource for TarArchive {
    fn visit(
        &self,
        visitor: &mut dyn FnMut(&EntryRecord, &mut dyn EntryPayload) -> Result<()>,
    ) -> Result<()> {
        let file = File::open(&self.path).map_err(|source| ArchiveError::Open {
            path: self.path.clone(),
            source,
        })?;

        let mut archive = tar::Archive::new(BufReader::new(file));
        archive.set_overwrite(false);
        archive.set_preserve_permissions(true);
        archive.set_preserve_mtime(true);

        let entries = archive.entries().map_err(|e| self.corrupt(e))?;
        for entry in entries {
            let mut entry = entry.map_err(|e| self.corrupt(e))?;
            let kind = match EntryKind::from_tar(entry.header().entry_type()) {
                Some(kind) => kind,
                None => continue,
            };

            let raw_name = entry.path().map_err(|e| self.corrupt(e))?;
            let name = normalize_name(&raw_name)?;
            if name.as_os_str().is_empty() && !kind.is_dir() {
                return Err(ArchiveError::UnsafePath {
                    name: raw_name.display().to_string(),
                }
                .into());
            }

            let link_target = if kind.is_link() {
                let target = entry
                    .link_name()
                    .map_err(|e| self.corrupt(e))?
                    .ok_or_else(|| ArchiveError::MissingLinkTarget {
                        name: name.display().to_string(),
                    })?;
                Some(match kind {
                    EntryKind::HardLink => normalize_name(&target)?,
                    _ => target.into_owned(),
                })
            } else {
                None
            };

            let record = EntryRecord {
                name,
                kind,
                link_target,
                size: entry.size(),
            };
            visitor(&record, &mut entry)?;
        }

        Ok(())
    }
}

/// Strip root and `.` components; refuse names that climb out with `..`
pub fn normalize_name(raw: &Path) -> std::result::Result<PathBuf, ArchiveError> {
    let mut name = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => name.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(ArchiveError::UnsafePath {
                    name: raw.display().to_string(),
                })
            }
        }
    }
    Ok(name)
}

/// Display form of an entry name for log fields
pub fn display_name(name: &Path) -> Cow<'_, str> {
    if name.as_os_str().is_empty() {
        Cow::Borrowed(".")
    } else {
        name.to_string_lossy()
    }
}
