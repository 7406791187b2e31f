//! Segments: one live file, its byte counter and its rotation barrier.
//!
//! A segment is created when the writer opens and after every successful
//! rotation, and is retired exactly once. Writers reach it through a
//! [`SegmentCell`], which always holds a fully initialized segment.
//!
//! # Write path
//!
//! ```text
//! read-lock slot ── Open ──> counter += len ── within limit ──> append
//!      │                                   └── over limit ───> rotation barrier
//!      ├── Retired ──> forward to the published replacement
//!      └── Closed ───> LogError::Closed
//! ```
//!
//! Appends hold the slot's read lock, so retirement (which takes the write
//! lock) waits for in-flight appends and no byte is ever written to a file
//! that has been renamed away.

use crate::archiver::Archiver;
use crate::error::{LogError, LogResult};
use logroll_storage::{naming, AppendFile, Renamer, StorageError};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;
use tracing::debug;

/// State of a segment's file handle.
#[derive(Debug)]
enum Slot {
    /// Accepting appends.
    Open(AppendFile),
    /// Renamed away; a replacement has been (or failed to be) published.
    Retired,
    /// Closed by the owner of the writer.
    Closed,
}

/// Result of offering bytes to a segment.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// The bytes were appended.
    Written(usize),
    /// The segment is retired; retry against this replacement.
    Forward(Arc<Segment>),
}

/// One physical log file.
#[derive(Debug)]
pub(crate) struct Segment {
    path: PathBuf,
    max_size: u64,
    /// Bytes accounted to this segment, including writes that crossed the
    /// threshold and were forwarded.
    written: AtomicU64,
    slot: RwLock<Slot>,
    /// Fires at most once per segment.
    rotation: OnceLock<()>,
    /// Position in the writer's chain of segments, starting at 0.
    generation: u64,
}

impl Segment {
    /// Wraps an open file whose current size is `written`.
    pub(crate) fn new(file: AppendFile, max_size: u64, written: u64, generation: u64) -> Self {
        Self {
            path: file.path().to_path_buf(),
            max_size,
            written: AtomicU64::new(written),
            slot: RwLock::new(Slot::Open(file)),
            rotation: OnceLock::new(),
            generation,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn written(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Appends `buf` if it fits, otherwise rotates and forwards.
    ///
    /// A write into an empty segment is always accepted, even if it alone
    /// exceeds the limit; otherwise an oversized payload would rotate
    /// forever.
    pub(crate) fn write(&self, buf: &[u8], cell: &SegmentCell) -> LogResult<Outcome> {
        {
            let slot = self.slot.read();
            match &*slot {
                Slot::Open(file) => {
                    let len = buf.len() as u64;
                    let before = self.written.fetch_add(len, Ordering::AcqRel);
                    if before == 0 || before.saturating_add(len) <= self.max_size {
                        file.append(buf)?;
                        return Ok(Outcome::Written(buf.len()));
                    }
                }
                Slot::Retired => return self.forward(cell),
                Slot::Closed => return Err(LogError::Closed),
            }
        }
        self.rotate_once(cell)
    }

    /// Runs retirement on the first over-threshold caller; everyone else
    /// blocks until it finishes.
    fn rotate_once(&self, cell: &SegmentCell) -> LogResult<Outcome> {
        let mut failure = None;
        self.rotation.get_or_init(|| {
            if let Err(err) = self.retire(cell) {
                failure = Some(err);
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        self.forward(cell)
    }

    /// Returns the published replacement, which must not be `self`.
    fn forward(&self, cell: &SegmentCell) -> LogResult<Outcome> {
        let replacement = cell.load();
        if std::ptr::eq(Arc::as_ptr(&replacement), self) {
            if cell.is_closed() {
                return Err(LogError::Closed);
            }
            return Err(LogError::RotationFailed);
        }
        Ok(Outcome::Forward(replacement))
    }

    /// Close, rename to the pending name, open a fresh file, publish, archive.
    fn retire(&self, cell: &SegmentCell) -> LogResult<()> {
        let mut slot = self.slot.write();
        let file = match std::mem::replace(&mut *slot, Slot::Retired) {
            Slot::Open(file) => file,
            Slot::Closed => {
                *slot = Slot::Closed;
                return Err(LogError::Closed);
            }
            Slot::Retired => return Err(LogError::rotation("segment already retired")),
        };

        file.close()
            .map_err(|err| LogError::rotation(format!("closing {}: {err}", self.path.display())))?;

        let pending = free_pending_path(&self.path, naming::unix_nanos(SystemTime::now())?);
        cell.renamer
            .rename(&self.path, &pending)
            .map_err(|source| {
                LogError::rotation(
                    StorageError::Rename {
                        from: self.path.clone(),
                        to: pending.clone(),
                        source,
                    }
                    .to_string(),
                )
            })?;

        let file = AppendFile::open(&self.path).map_err(|err| LogError::rotation(err.to_string()))?;
        let replacement = Arc::new(Segment::new(file, self.max_size, 0, self.generation + 1));
        cell.publish(replacement);
        drop(slot);

        cell.rotations.fetch_add(1, Ordering::AcqRel);
        debug!(
            path = %self.path.display(),
            retired = %pending.display(),
            generation = self.generation + 1,
            "rotated log"
        );

        cell.archiver.dispatch(pending.clone()).map_err(|err| {
            LogError::rotation(format!("archiving {}: {err}", pending.display()))
        })
    }

    /// Flushes the open file, if any.
    pub(crate) fn flush(&self) -> LogResult<()> {
        match &*self.slot.read() {
            Slot::Open(file) => Ok(file.flush()?),
            Slot::Retired => Ok(()),
            Slot::Closed => Err(LogError::Closed),
        }
    }

    /// Syncs the open file, if any.
    pub(crate) fn sync(&self) -> LogResult<()> {
        match &*self.slot.read() {
            Slot::Open(file) => Ok(file.sync()?),
            Slot::Retired => Ok(()),
            Slot::Closed => Err(LogError::Closed),
        }
    }

    /// Closes the file. Returns `false` if the segment was retired first,
    /// in which case the caller should close its replacement instead.
    pub(crate) fn close(&self) -> LogResult<bool> {
        let mut slot = self.slot.write();
        match std::mem::replace(&mut *slot, Slot::Closed) {
            Slot::Open(file) => {
                file.close()?;
                Ok(true)
            }
            Slot::Closed => Ok(true),
            Slot::Retired => {
                *slot = Slot::Retired;
                Ok(false)
            }
        }
    }
}

/// First `<path>.<nanos>` at or after `timestamp` with no pending file or
/// archive already on disk.
fn free_pending_path(live: &Path, mut timestamp: u64) -> PathBuf {
    loop {
        let pending = naming::pending_path(live, timestamp);
        if !pending.exists() && !naming::archive_path(&pending).exists() {
            return pending;
        }
        timestamp = timestamp.wrapping_add(1);
    }
}

/// The writer's shared reference to its current segment, plus what a
/// segment needs to replace itself.
#[derive(Debug)]
pub(crate) struct SegmentCell {
    current: RwLock<Arc<Segment>>,
    renamer: Arc<dyn Renamer>,
    archiver: Archiver,
    rotations: AtomicU64,
    closed: AtomicBool,
}

impl SegmentCell {
    pub(crate) fn new(initial: Segment, renamer: Arc<dyn Renamer>, archiver: Archiver) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            renamer,
            archiver,
            rotations: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the current segment.
    pub(crate) fn load(&self) -> Arc<Segment> {
        Arc::clone(&self.current.read())
    }

    fn publish(&self, segment: Arc<Segment>) {
        *self.current.write() = segment;
    }

    pub(crate) fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Acquire)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Marks the cell closed. Returns `true` if it was already closed.
    pub(crate) fn mark_closed(&self) -> bool {
        self.closed.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiver::ArchiveMode;
    use logroll_storage::FsRenamer;
    use std::io;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct RefusingRenamer;

    impl Renamer for RefusingRenamer {
        fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "refused"))
        }
    }

    fn cell_at(path: &Path, max_size: u64, renamer: Arc<dyn Renamer>) -> SegmentCell {
        let file = AppendFile::open(path).unwrap();
        SegmentCell::new(
            Segment::new(file, max_size, 0, 0),
            renamer,
            Archiver::new(ArchiveMode::Inline),
        )
    }

    fn write_through(cell: &SegmentCell, buf: &[u8]) -> LogResult<usize> {
        let mut segment = cell.load();
        loop {
            match segment.write(buf, cell)? {
                Outcome::Written(n) => return Ok(n),
                Outcome::Forward(next) => segment = next,
            }
        }
    }

    #[test]
    fn writes_within_limit_stay_in_segment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.log");
        let cell = cell_at(&path, 10, Arc::new(FsRenamer));

        assert_eq!(write_through(&cell, b"12345").unwrap(), 5);
        assert_eq!(write_through(&cell, b"67890").unwrap(), 5);

        assert_eq!(cell.rotations(), 0);
        assert_eq!(cell.load().generation(), 0);
        assert_eq!(cell.load().written(), 10);
        assert_eq!(std::fs::read(&path).unwrap(), b"1234567890");
    }

    #[test]
    fn crossing_limit_rotates_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.log");
        let cell = cell_at(&path, 10, Arc::new(FsRenamer));

        write_through(&cell, b"aaaaaaaa").unwrap();
        write_through(&cell, b"bbbb").unwrap();

        assert_eq!(cell.rotations(), 1);
        let current = cell.load();
        assert_eq!(current.generation(), 1);
        assert_eq!(current.written(), 4);
        assert_eq!(current.path(), path);
        assert_eq!(std::fs::read(&path).unwrap(), b"bbbb");
    }

    #[test]
    fn oversized_write_lands_in_empty_segment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.log");
        let cell = cell_at(&path, 4, Arc::new(FsRenamer));

        write_through(&cell, b"0123456789").unwrap();
        assert_eq!(cell.rotations(), 0);

        write_through(&cell, b"x").unwrap();
        assert_eq!(cell.rotations(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn failed_rename_reports_to_trigger_then_generic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.log");
        let cell = cell_at(&path, 4, Arc::new(RefusingRenamer));

        write_through(&cell, b"abcd").unwrap();

        let first = write_through(&cell, b"e").unwrap_err();
        assert!(matches!(first, LogError::Rotation { .. }));
        assert!(first.to_string().contains("refused"));

        let second = write_through(&cell, b"f").unwrap_err();
        assert!(matches!(second, LogError::RotationFailed));
        assert_eq!(cell.rotations(), 0);
    }

    #[test]
    fn close_then_write_fails() {
        let dir = tempdir().unwrap();
        let cell = cell_at(&dir.path().join("seg.log"), 100, Arc::new(FsRenamer));

        assert!(cell.load().close().unwrap());
        assert!(matches!(
            write_through(&cell, b"late"),
            Err(LogError::Closed)
        ));
        assert!(matches!(cell.load().flush(), Err(LogError::Closed)));
    }

    #[test]
    fn retired_segment_forwards() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.log");
        let cell = cell_at(&path, 4, Arc::new(FsRenamer));

        let original = cell.load();
        write_through(&cell, b"abcd").unwrap();
        write_through(&cell, b"e").unwrap();

        // A stale handle to the retired segment still reaches the live file.
        match original.write(b"f", &cell).unwrap() {
            Outcome::Forward(next) => assert_eq!(next.generation(), 1),
            Outcome::Written(_) => panic!("retired segment accepted a write"),
        }
        assert!(!original.close().unwrap());
    }

    #[test]
    fn pending_path_skips_taken_names() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("seg.log");
        std::fs::write(naming::pending_path(&live, 10), b"").unwrap();
        std::fs::write(naming::archive_path(&naming::pending_path(&live, 11)), b"").unwrap();

        assert_eq!(free_pending_path(&live, 10), naming::pending_path(&live, 12));
    }
}
