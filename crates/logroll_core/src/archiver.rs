//! Compression of retired segments.
//!
//! A retired segment arrives here as `<path>.<unixNanos>`. The archiver
//! writes `<path>.<unixNanos>.zip.tmp`, renames it to
//! `<path>.<unixNanos>.zip` and only then removes the uncompressed file, so
//! the reaper never sees a partially written archive.

use crate::error::{LogError, LogResult};
use logroll_storage::naming;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of background archiver threads.
const ARCHIVER_THREAD_NAME: &str = "logroll-archiver";

/// Where archiving runs relative to the rotation that produced the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveMode {
    /// On a detached thread. Errors are logged and otherwise dropped: the
    /// rotating caller has already returned and the write path must not wait
    /// on compression.
    #[default]
    Background,
    /// Inline with the rotating write. Errors propagate to that caller.
    Inline,
}

/// Compresses retired segment files into zip archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Archiver {
    mode: ArchiveMode,
}

impl Archiver {
    /// Creates an archiver running in `mode`.
    #[must_use]
    pub const fn new(mode: ArchiveMode) -> Self {
        Self { mode }
    }

    /// Returns the archiving mode.
    #[must_use]
    pub const fn mode(&self) -> ArchiveMode {
        self.mode
    }

    /// Archives `pending` according to the mode.
    ///
    /// In [`ArchiveMode::Inline`] the result of [`compress_file`] is
    /// returned. In [`ArchiveMode::Background`] this returns immediately.
    ///
    /// # Errors
    ///
    /// Only inline archiving returns errors.
    pub fn dispatch(&self, pending: PathBuf) -> LogResult<()> {
        match self.mode {
            ArchiveMode::Inline => compress_file(&pending).map(|_| ()),
            ArchiveMode::Background => {
                let spawned = std::thread::Builder::new()
                    .name(ARCHIVER_THREAD_NAME.to_string())
                    .spawn(move || archive_detached(&pending));
                if let Err(err) = spawned {
                    warn!(error = %err, "cannot spawn archiver thread");
                }
                Ok(())
            }
        }
    }
}

fn archive_detached(pending: &Path) {
    match compress_file(pending) {
        Ok(archive) => debug!(archive = %archive.display(), "archived rotated log"),
        Err(err) => warn!(
            file = %pending.display(),
            error = %err,
            "archiving rotated log failed"
        ),
    }
}

/// Compresses `pending` into `<pending>.zip` and deletes `pending`.
///
/// The archive holds a single deflated entry named after the pending file.
/// Returns the path of the archive.
///
/// # Errors
///
/// Returns an error if the source cannot be read, the archive cannot be
/// written or renamed into place, or the source cannot be removed. In every
/// case `pending` is left in place unless the final removal is what failed.
pub fn compress_file(pending: &Path) -> LogResult<PathBuf> {
    let entry_name = pending
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            LogError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not an archivable file name: {}", pending.display()),
            ))
        })?;
    let temp = naming::temp_archive_path(pending);
    let archive = naming::archive_path(pending);

    if let Err(err) = write_archive(pending, &temp, entry_name) {
        let _ = fs::remove_file(&temp);
        return Err(err);
    }
    fs::rename(&temp, &archive)?;
    fs::remove_file(pending)?;
    Ok(archive)
}

/// Deflates `source` into a single-entry zip at `target` and syncs it.
fn write_archive(source: &Path, target: &Path, entry_name: &str) -> LogResult<()> {
    let mut input = File::open(source)?;
    let source_len = input.metadata()?.len();

    let mut zip = ZipWriter::new(BufWriter::new(File::create(target)?));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(source_len >= u64::from(u32::MAX));
    zip.start_file(entry_name, options)?;
    io::copy(&mut input, &mut zip)?;
    let mut out = zip.finish()?;
    out.flush()?;
    out.get_ref().sync_all()?;
    Ok(())
}
