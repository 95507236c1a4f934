//! Extraction worker
//!
//! Each worker:
//! - Replays the whole archive, counting directory entries to find its own
//! - Creates the directories it owns and records them
//! - Materializes files and links whose parent directory it owns
//! - Defers links whose relative target does not exist yet
//! - Waits at the link barrier, then creates its deferred links

use crate::aggregate::WorkerCounters;
use crate::config::ExtractConfig;
use crate::error::{ArchiveError, FsError, FsOp, Result, ToolError, WorkerError};
use crate::extract::archive::{display_name, ArchiveSource, EntryKind, EntryPayload, EntryRecord};
use crate::extract::barrier::BarrierGate;
use crate::message::WorkerReport;
use crate::partition::DirOwnership;
use crate::race::{classify, Race};
use crate::worker::WorkerThread;
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

/// Counters collected by an extraction worker
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractResult {
    /// Files, links and special entries created
    pub files_extracted: u64,

    /// Directory entries created
    pub dirs_extracted: u64,

    /// Directory creations that lost a race on a shared parent
    pub dir_create_collisions: u64,

    /// Links held back until after the barrier
    pub links_deferred: u64,

    /// Symlinks a peer had already created
    pub link_collisions: u64,

    /// File payload bytes written
    pub bytes_extracted: u64,
}

impl AddAssign for ExtractResult {
    fn add_assign(&mut self, rhs: Self) {
        self.files_extracted += rhs.files_extracted;
        self.dirs_extracted += rhs.dirs_extracted;
        self.dir_create_collisions += rhs.dir_create_collisions;
        self.links_deferred += rhs.links_deferred;
        self.link_collisions += rhs.link_collisions;
        self.bytes_extracted += rhs.bytes_extracted;
    }
}

impl WorkerCounters for ExtractResult {
    fn files(&self) -> u64 {
        self.files_extracted
    }

    fn dirs(&self) -> u64 {
        self.dirs_extracted
    }
}

/// A link whose target did not exist when its entry was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredLink {
    pub name: PathBuf,
    pub kind: EntryKind,
    pub target: PathBuf,
}

/// One worker's view of the extraction
///
/// Configuration is borrowed and immutable; everything mutable is private
/// to this worker.
pub struct ExtractWorker<'a> {
    id: usize,
    config: &'a ExtractConfig,
    ownership: DirOwnership,
    /// Directories this worker created from their own entries
    owned: HashSet<PathBuf>,
    /// Every directory entry seen in the stream, owned or not
    seen: HashSet<PathBuf>,
    deferred: Vec<DeferredLink>,
    result: ExtractResult,
}

impl<'a> ExtractWorker<'a> {
    pub fn new(id: usize, config: &'a ExtractConfig) -> Self {
        Self {
            id,
            config,
            ownership: DirOwnership::new(id, config.options.worker_count),
            owned: HashSet::new(),
            seen: HashSet::new(),
            deferred: Vec::new(),
            result: ExtractResult::default(),
        }
    }

    /// Single pass over the archive: directories, files and resolvable links
    pub fn phase_one(&mut self, source: &dyn ArchiveSource) -> Result<()> {
        source.visit(&mut |record, payload| self.handle(record, payload))
    }

    /// Create every deferred link; only valid after the barrier
    pub fn phase_two(&mut self) -> Result<()> {
        let deferred = std::mem::take(&mut self.deferred);
        for link in &deferred {
            self.materialize_link(link)?;
        }
        Ok(())
    }

    pub fn result(&self) -> ExtractResult {
        self.result
    }

    /// Directories this worker owns
    pub fn owned_dirs(&self) -> &HashSet<PathBuf> {
        &self.owned
    }

    pub fn deferred_links(&self) -> &[DeferredLink] {
        &self.deferred
    }

    fn handle(&mut self, record: &EntryRecord, payload: &mut dyn EntryPayload) -> Result<()> {
        if record.kind.is_dir() {
            self.seen.insert(record.name.clone());
            if self.ownership.next_dir() {
                self.materialize_dir(&record.name)?;
                self.owned.insert(record.name.clone());
                self.result.dirs_extracted += 1;
            }
            return Ok(());
        }

        if !self.owns_parent(record.parent())? {
            return Ok(());
        }

        match record.kind {
            EntryKind::Symlink | EntryKind::HardLink => self.link(record),
            _ => self.write_entry(record, payload),
        }
    }

    /// Whether this worker materializes entries directly under `parent`
    fn owns_parent(&mut self, parent: &Path) -> Result<bool> {
        if self.owned.contains(parent) {
            return Ok(true);
        }
        if self.seen.contains(parent) {
            return Ok(false);
        }
        if self.ownership.orphan_owner(parent) != self.id {
            return Ok(false);
        }

        // No entry for this directory: create it as a plain parent path.
        self.ensure_inside(parent)?;
        let dst = self.config.destination.join(parent);
        fs::create_dir_all(&dst).map_err(|e| FsError::new(FsOp::CreateDir, &dst, e))?;
        // A peer's symlink may have landed between the check and the create.
        self.ensure_inside(parent)?;
        self.owned.insert(parent.to_path_buf());
        Ok(true)
    }

    fn materialize_dir(&mut self, name: &Path) -> Result<()> {
        if name.as_os_str().is_empty() {
            return Ok(());
        }
        self.ensure_inside(name)?;
        let dst = self.config.destination.join(name);

        if self.config.options.trace {
            debug!(worker = self.id, dir = %display_name(name), "Creating directory");
        }

        self.create_dir_retrying(name, &dst, create_dir_with_parents)?;
        self.ensure_inside(name)
    }

    /// One strict attempt; on a collision, back off by worker index and
    /// retry once with ancestor collisions tolerated
    fn create_dir_retrying(
        &mut self,
        name: &Path,
        dst: &Path,
        mut first_attempt: impl FnMut(&Path) -> io::Result<()>,
    ) -> Result<()> {
        match first_attempt(dst) {
            Ok(()) => Ok(()),
            Err(e) if classify(&e) == Some(Race::AlreadyExists) => {
                self.result.dir_create_collisions += 1;
                let backoff = self.config.collision_backoff * self.id as u32;
                if self.config.options.trace {
                    debug!(
                        worker = self.id,
                        dir = %display_name(name),
                        backoff_ms = backoff.as_millis() as u64,
                        "Parent creation collided, retrying once"
                    );
                }
                thread::sleep(backoff);
                fs::create_dir_all(dst).map_err(|e| FsError::new(FsOp::CreateDir, dst, e).into())
            }
            Err(e) => Err(FsError::new(FsOp::CreateDir, dst, e).into()),
        }
    }

    fn write_entry(&mut self, record: &EntryRecord, payload: &mut dyn EntryPayload) -> Result<()> {
        self.ensure_inside(record.parent())?;
        let dst = self.config.destination.join(&record.name);

        if self.config.options.trace {
            debug!(worker = self.id, file = %display_name(&record.name), "Extracting");
        }

        payload.unpack(&dst).map_err(|e| -> ToolError {
            match e.kind() {
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
                    ArchiveError::Corrupt {
                        path: self.config.archive.clone(),
                        source: e,
                    }
                    .into()
                }
                _ => FsError::new(FsOp::WriteFile, &dst, e).into(),
            }
        })?;

        self.result.files_extracted += 1;
        self.result.bytes_extracted += record.size;
        Ok(())
    }

    fn link(&mut self, record: &EntryRecord) -> Result<()> {
        let target = record
            .link_target
            .clone()
            .ok_or_else(|| ArchiveError::MissingLinkTarget {
                name: record.name.display().to_string(),
            })?;
        self.ensure_inside(record.parent())?;
        if record.kind == EntryKind::HardLink {
            if let Some(target_dir) = target.parent() {
                self.ensure_inside(target_dir)?;
            }
        }
        let link = DeferredLink {
            name: record.name.clone(),
            kind: record.kind,
            target,
        };

        if !self.resolve_target(&link).exists() {
            if link.target.is_absolute() {
                // Created anyway, dangling, the way tar does.
                if self.config.options.trace {
                    debug!(
                        worker = self.id,
                        link = %display_name(&link.name),
                        target = %link.target.display(),
                        "Link points at a missing absolute path"
                    );
                }
            } else {
                if self.config.options.trace {
                    debug!(
                        worker = self.id,
                        link = %display_name(&link.name),
                        target = %link.target.display(),
                        "Deferring link to a target that does not exist yet"
                    );
                }
                self.result.links_deferred += 1;
                self.deferred.push(link);
                return Ok(());
            }
        }

        self.materialize_link(&link)
    }

    /// Refuse `rel` if any existing component of it under the destination
    /// is a symlink
    ///
    /// Components that do not exist yet stop the check: whatever creates
    /// them creates real directories.
    fn ensure_inside(&self, rel: &Path) -> Result<()> {
        let mut current = self.config.destination.clone();
        for component in rel.components() {
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    return Err(ArchiveError::UnsafePath {
                        name: rel.display().to_string(),
                    }
                    .into());
                }
                Ok(_) => {}
                Err(e) if classify(&e) == Some(Race::Vanished) => return Ok(()),
                Err(e) => return Err(FsError::new(FsOp::CreateDir, &current, e).into()),
            }
        }
        Ok(())
    }

    /// Where on disk the link's target lives
    fn resolve_target(&self, link: &DeferredLink) -> PathBuf {
        match link.kind {
            EntryKind::HardLink => self.config.destination.join(&link.target),
            _ => {
                let dst = self.config.destination.join(&link.name);
                match dst.parent() {
                    Some(dir) => dir.join(&link.target),
                    None => link.target.clone(),
                }
            }
        }
    }

    fn materialize_link(&mut self, link: &DeferredLink) -> Result<()> {
        let dst = self.config.destination.join(&link.name);

        if self.config.options.trace {
            debug!(
                worker = self.id,
                link = %display_name(&link.name),
                target = %link.target.display(),
                "Creating link"
            );
        }

        match link.kind {
            EntryKind::HardLink => {
                let source = self.resolve_target(link);
                fs::hard_link(&source, &dst).map_err(|e| FsError::new(FsOp::HardLink, &dst, e))?;
            }
            _ => match make_symlink(&link.target, &dst) {
                Ok(()) => {}
                Err(e) if classify(&e) == Some(Race::AlreadyExists) => {
                    self.result.link_collisions += 1;
                    return Ok(());
                }
                Err(e) => return Err(FsError::new(FsOp::Symlink, &dst, e).into()),
            },
        }

        self.result.files_extracted += 1;
        Ok(())
    }
}

/// Create `dst`, first creating any missing ancestors one by one
///
/// Ancestor creation is check-then-create, so two workers filling in the
/// same missing ancestor can collide with `AlreadyExists`; the caller
/// decides what to do about that. `dst` itself already existing as a
/// directory is fine.
fn create_dir_with_parents(dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            create_missing(parent)?;
        }
    }

    match fs::create_dir(dst) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dst.is_dir() => Ok(()),
        other => other,
    }
}

fn create_missing(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    if let Some(parent) = dir.parent() {
        create_missing(parent)?;
    }
    fs::create_dir(dir)
}

#[cfg(unix)]
fn make_symlink(target: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(windows)]
fn make_symlink(target: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, dst)
}

/// Spawn an extraction worker on its own thread
pub fn spawn(
    id: usize,
    config: Arc<ExtractConfig>,
    source: Arc<dyn ArchiveSource>,
    gate: BarrierGate,
    report_tx: Sender<WorkerReport<ExtractResult>>,
) -> std::result::Result<WorkerThread, WorkerError> {
    WorkerThread::spawn(id, "untar", move || {
        let report = match run(id, &config, source.as_ref(), gate, &report_tx) {
            Ok(result) => {
                info!(
                    worker = id,
                    files = result.files_extracted,
                    dirs = result.dirs_extracted,
                    collisions = result.dir_create_collisions,
                    "Worker finished"
                );
                WorkerReport::Finished { worker: id, result }
            }
            Err(e) => WorkerReport::failed(id, e),
        };
        let _ = report_tx.send(report);
    })
}

fn run(
    id: usize,
    config: &ExtractConfig,
    source: &dyn ArchiveSource,
    gate: BarrierGate,
    report_tx: &Sender<WorkerReport<ExtractResult>>,
) -> Result<ExtractResult> {
    let mut worker = ExtractWorker::new(id, config);
    worker.phase_one(source)?;

    report_tx
        .send(WorkerReport::Ready { worker: id })
        .map_err(|_| WorkerError::BarrierAbandoned { id })?;
    gate.wait()?;

    worker.phase_two()?;
    Ok(worker.result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunOptions;
    use crate::extract::archive::TarArchive;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config(archive: &Path, dest: &Path, workers: usize) -> ExtractConfig {
        ExtractConfig {
            archive: archive.to_path_buf(),
            destination: dest.to_path_buf(),
            collision_backoff: Duration::from_millis(1),
            options: RunOptions::new(workers, false).unwrap(),
        }
    }

    fn dir_entry(builder: &mut tar::Builder<fs::File>, name: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_mode(0o755);
        header.set_size(0);
        builder.append_data(&mut header, name, io::empty()).unwrap();
    }

    fn file_entry(builder: &mut tar::Builder<fs::File>, name: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_mode(0o644);
        header.set_size(data.len() as u64);
        builder.append_data(&mut header, name, data).unwrap();
    }

    fn symlink_entry(builder: &mut tar::Builder<fs::File>, name: &str, target: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_mode(0o777);
        header.set_size(0);
        builder.append_link(&mut header, name, target).unwrap();
    }

    fn build(path: &Path, f: impl FnOnce(&mut tar::Builder<fs::File>)) {
        let mut builder = tar::Builder::new(fs::File::create(path).unwrap());
        f(&mut builder);
        builder.finish().unwrap();
    }

    #[test]
    fn test_single_worker_extracts_everything() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.tar");
        build(&archive, |b| {
            dir_entry(b, "top/");
            dir_entry(b, "top/sub/");
            file_entry(b, "top/sub/x.txt", b"xyz");
            file_entry(b, "top/y.txt", b"yy");
        });
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let cfg = config(&archive, &dest, 1);
        let mut worker = ExtractWorker::new(0, &cfg);
        worker.phase_one(&TarArchive::new(&archive)).unwrap();
        worker.phase_two().unwrap();

        assert_eq!(fs::read(dest.join("top/sub/x.txt")).unwrap(), b"xyz");
        assert_eq!(fs::read(dest.join("top/y.txt")).unwrap(), b"yy");
        let result = worker.result();
        assert_eq!(result.dirs_extracted, 2);
        assert_eq!(result.files_extracted, 2);
        assert_eq!(result.bytes_extracted, 5);
    }

    #[test]
    fn test_files_follow_their_parent_owner() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.tar");
        build(&archive, |b| {
            for d in 0..6 {
                dir_entry(b, &format!("d{}/", d));
                for f in 0..3 {
                    file_entry(b, &format!("d{}/f{}", d, f), b"data");
                }
            }
        });

        let workers = 3;
        let source = TarArchive::new(&archive);
        let mut all_files = Vec::new();

        for id in 0..workers {
            let dest = dir.path().join(format!("out{}", id));
            fs::create_dir(&dest).unwrap();
            let cfg = config(&archive, &dest, workers);
            let mut worker = ExtractWorker::new(id, &cfg);
            worker.phase_one(&source).unwrap();

            let owned = worker.owned_dirs().clone();
            assert_eq!(owned.len(), 2, "worker {} owns {:?}", id, owned);
            for d in &owned {
                // Directory entry k goes to worker k mod N.
                let k: usize = d.to_str().unwrap()[1..].parse().unwrap();
                assert_eq!(k % workers, id);
                for f in fs::read_dir(dest.join(d)).unwrap() {
                    all_files.push(f.unwrap().path().strip_prefix(&dest).unwrap().to_path_buf());
                }
            }
            assert_eq!(worker.result().files_extracted, 6);
        }

        all_files.sort();
        all_files.dedup();
        assert_eq!(all_files.len(), 18);
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_link_to_missing_target_is_deferred() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.tar");
        build(&archive, |b| {
            dir_entry(b, "top/");
            symlink_entry(b, "top/early", "late.txt");
            symlink_entry(b, "top/abs", "/definitely/not/here");
            file_entry(b, "top/late.txt", b"late");
        });
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let cfg = config(&archive, &dest, 1);
        let mut worker = ExtractWorker::new(0, &cfg);
        worker.phase_one(&TarArchive::new(&archive)).unwrap();

        assert_eq!(worker.deferred_links().len(), 1);
        assert_eq!(worker.deferred_links()[0].name, PathBuf::from("top/early"));
        assert!(fs::symlink_metadata(dest.join("top/early")).is_err());
        // Absolute missing targets are created dangling right away.
        assert_eq!(
            fs::read_link(dest.join("top/abs")).unwrap(),
            PathBuf::from("/definitely/not/here")
        );

        worker.phase_two().unwrap();
        assert_eq!(fs::read_link(dest.join("top/early")).unwrap(), PathBuf::from("late.txt"));
        assert_eq!(fs::read(dest.join("top/early")).unwrap(), b"late");
        assert_eq!(worker.result().links_deferred, 1);
        assert_eq!(worker.result().files_extracted, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_symlink_is_tolerated_existing_file_is_not() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        fs::create_dir_all(dest.join("top")).unwrap();
        std::os::unix::fs::symlink("x", dest.join("top/link")).unwrap();

        let archive = dir.path().join("a.tar");
        build(&archive, |b| {
            dir_entry(b, "top/");
            file_entry(b, "top/x", b"1");
            symlink_entry(b, "top/link", "x");
        });
        let cfg = config(&archive, &dest, 1);
        let mut worker = ExtractWorker::new(0, &cfg);
        worker.phase_one(&TarArchive::new(&archive)).unwrap();
        assert_eq!(worker.result().link_collisions, 1);

        // Second pass over the same destination: the regular file now exists.
        let mut again = ExtractWorker::new(0, &cfg);
        let err = again.phase_one(&TarArchive::new(&archive)).unwrap_err();
        assert!(matches!(err, crate::error::ToolError::Fs(ref e) if e.op == FsOp::WriteFile));
    }

    #[test]
    fn test_entries_without_dir_entries_get_an_owner() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.tar");
        build(&archive, |b| {
            file_entry(b, "toplevel.txt", b"t");
            file_entry(b, "implicit/dir/file.txt", b"f");
        });

        let workers = 4;
        let mut extracted = 0;
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        for id in 0..workers {
            let cfg = config(&archive, &dest, workers);
            let mut worker = ExtractWorker::new(id, &cfg);
            worker.phase_one(&TarArchive::new(&archive)).unwrap();
            extracted += worker.result().files_extracted;
        }

        assert_eq!(extracted, 2);
        assert_eq!(fs::read(dest.join("toplevel.txt")).unwrap(), b"t");
        assert_eq!(fs::read(dest.join("implicit/dir/file.txt")).unwrap(), b"f");
    }

    #[test]
    fn test_create_dir_with_parents_tolerates_existing_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a/b/c");
        create_dir_with_parents(&target).unwrap();
        assert!(target.is_dir());
        create_dir_with_parents(&target).unwrap();
    }

    fn hardlink_entry(builder: &mut tar::Builder<fs::File>, name: &str, target: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Link);
        header.set_mode(0o644);
        header.set_size(0);
        builder.append_link(&mut header, name, target).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_entries_under_a_symlinked_dir_are_refused() {
        let dir = tempdir().unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        let outside_str = outside.to_str().unwrap().to_string();

        let archive = dir.path().join("a.tar");
        build(&archive, |b| {
            dir_entry(b, "top/");
            symlink_entry(b, "top/evil", &outside_str);
            file_entry(b, "top/evil/pwned", b"gotcha");
        });
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let cfg = config(&archive, &dest, 1);
        let mut worker = ExtractWorker::new(0, &cfg);
        let err = worker.phase_one(&TarArchive::new(&archive)).unwrap_err();

        assert!(matches!(
            err,
            ToolError::Archive(ArchiveError::UnsafePath { .. })
        ));
        assert!(!outside.join("pwned").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_dir_entry_under_a_symlink_is_refused() {
        let dir = tempdir().unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        let outside_str = outside.to_str().unwrap().to_string();

        let archive = dir.path().join("a.tar");
        build(&archive, |b| {
            dir_entry(b, "top/");
            symlink_entry(b, "top/evil", &outside_str);
            dir_entry(b, "top/evil/sub/");
        });
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let cfg = config(&archive, &dest, 1);
        let mut worker = ExtractWorker::new(0, &cfg);
        assert!(worker.phase_one(&TarArchive::new(&archive)).is_err());
        assert!(!outside.join("sub").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_hardlink_through_a_symlinked_dir_is_refused() {
        let dir = tempdir().unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("secret"), b"s3cr3t").unwrap();
        let outside_str = outside.to_str().unwrap().to_string();

        let archive = dir.path().join("a.tar");
        build(&archive, |b| {
            dir_entry(b, "top/");
            symlink_entry(b, "top/evil", &outside_str);
            hardlink_entry(b, "top/stolen", "top/evil/secret");
        });
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let cfg = config(&archive, &dest, 1);
        let mut worker = ExtractWorker::new(0, &cfg);
        let err = worker.phase_one(&TarArchive::new(&archive)).unwrap_err();

        assert!(matches!(
            err,
            ToolError::Archive(ArchiveError::UnsafePath { .. })
        ));
        assert!(fs::symlink_metadata(dest.join("top/stolen")).is_err());
    }

    #[test]
    fn test_dir_collision_backs_off_and_retries_once() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        let mut cfg = config(Path::new("unused.tar"), &dest, 4);
        cfg.collision_backoff = Duration::from_millis(20);

        // A peer creates the ancestor between our check and our create.
        let target = dest.join("x/y/a0");
        let mut attempts = 0;
        let mut worker = ExtractWorker::new(2, &cfg);
        let start = std::time::Instant::now();
        worker
            .create_dir_retrying(Path::new("x/y/a0"), &target, |_| {
                attempts += 1;
                fs::create_dir_all(dest.join("x/y")).unwrap();
                Err(io::Error::from(io::ErrorKind::AlreadyExists))
            })
            .unwrap();

        assert_eq!(attempts, 1);
        assert!(target.is_dir());
        assert_eq!(worker.result().dir_create_collisions, 1);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_second_dir_collision_is_fatal() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        // A regular file where the directory should go fails the retry too.
        fs::write(dest.join("blocked"), b"").unwrap();
        let cfg = config(Path::new("unused.tar"), &dest, 2);

        let mut worker = ExtractWorker::new(1, &cfg);
        let err = worker
            .create_dir_retrying(Path::new("blocked"), &dest.join("blocked"), |_| {
                Err(io::Error::from(io::ErrorKind::AlreadyExists))
            })
            .unwrap_err();

        assert!(matches!(err, ToolError::Fs(ref e) if e.op == FsOp::CreateDir));
        assert_eq!(worker.result().dir_create_collisions, 1);
    }
}
