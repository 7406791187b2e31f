//! The rotating writer.

use crate::archiver::{ArchiveMode, Archiver};
use crate::config::Config;
use crate::error::{LogError, LogResult};
use crate::reaper::Reaper;
use crate::segment::{Outcome, Segment, SegmentCell};
use logroll_storage::{existing_len, AppendFile, FsRenamer, Renamer};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A write sink that rolls its file over at a size threshold.
///
/// Any number of threads may call [`write`](Self::write) concurrently
/// through a shared reference. When a write pushes the live file past
/// `max_size_bytes`, exactly one of the writers involved renames the file to
/// `<path>.<unixNanos>`, opens a fresh file at `<path>` and publishes it;
/// the others wait for that to finish and then write into the new file.
/// The renamed file is compressed to `<path>.<unixNanos>.zip` in the
/// background (or inline, see [`Config::synchronous_archiving`]).
///
/// # Example
///
/// ```rust
/// use logroll_core::{Config, RotatingWriter};
///
/// let dir = tempfile::tempdir().unwrap();
/// let writer = RotatingWriter::open(
///     Config::new()
///         .path(dir.path().join("agent.log"))
///         .max_size_bytes(1024),
/// )
/// .unwrap();
///
/// writer.write(b"agent started\n").unwrap();
/// writer.close().unwrap();
/// assert!(writer.write(b"too late\n").is_err());
/// ```
pub struct RotatingWriter {
    config: Config,
    cell: SegmentCell,
}

impl RotatingWriter {
    /// Opens a writer, appending to any file already at the configured path.
    ///
    /// Defaults are applied first (see [`Config::resolve`]). The size of an
    /// existing file seeds the byte counter, so the next write may rotate
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be inspected for a reason other
    /// than not existing, or if the file cannot be opened.
    pub fn open(config: Config) -> LogResult<Self> {
        Self::open_with_renamer(config, Arc::new(FsRenamer))
    }

    /// Opens a writer that retires segments through `renamer`.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_renamer(config: Config, renamer: Arc<dyn Renamer>) -> LogResult<Self> {
        let config = config.resolve();
        let written = existing_len(&config.path)?;
        let file = AppendFile::open(&config.path)?;

        let mode = if config.synchronous_archiving {
            ArchiveMode::Inline
        } else {
            ArchiveMode::Background
        };
        let segment = Segment::new(file, config.max_size_bytes, written, 0);
        debug!(
            path = %config.path.display(),
            max_size_bytes = config.max_size_bytes,
            existing_bytes = written,
            "opened rotating log"
        );

        Ok(Self {
            cell: SegmentCell::new(segment, renamer, Archiver::new(mode)),
            config,
        })
    }

    /// Writes all of `buf`, rotating first if it would cross the threshold.
    ///
    /// Returns `buf.len()` on success.
    ///
    /// # Errors
    ///
    /// - [`LogError::Closed`] after [`close`](Self::close)
    /// - [`LogError::Rotation`] to the caller whose write triggered a
    ///   rotation that failed
    /// - [`LogError::RotationFailed`] to callers that raced a failed rotation
    /// - storage errors if the append itself fails
    pub fn write(&self, buf: &[u8]) -> LogResult<usize> {
        if self.cell.is_closed() {
            return Err(LogError::Closed);
        }
        let mut segment = self.cell.load();
        loop {
            match segment.write(buf, &self.cell)? {
                Outcome::Written(n) => return Ok(n),
                Outcome::Forward(next) => segment = next,
            }
        }
    }

    /// Flushes the live file.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is closed or the flush fails.
    pub fn flush(&self) -> LogResult<()> {
        if self.cell.is_closed() {
            return Err(LogError::Closed);
        }
        self.cell.load().flush()
    }

    /// Syncs the live file to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is closed or the sync fails.
    pub fn sync(&self) -> LogResult<()> {
        if self.cell.is_closed() {
            return Err(LogError::Closed);
        }
        self.cell.load().sync()
    }

    /// Closes the live file. Later writes fail with [`LogError::Closed`].
    ///
    /// Archiving already under way and any running reaper are not stopped.
    /// Closing twice is a no-op, as is closing after a failed rotation.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync of the live file fails.
    pub fn close(&self) -> LogResult<()> {
        if self.cell.mark_closed() {
            return Ok(());
        }
        loop {
            let segment = self.cell.load();
            if segment.close()? {
                debug!(path = %self.config.path.display(), "closed rotating log");
                return Ok(());
            }
            // Retired without a replacement: the failed rotation already
            // released the file.
            if Arc::ptr_eq(&self.cell.load(), &segment) {
                debug!(
                    path = %self.config.path.display(),
                    "closed rotating log after failed rotation"
                );
                return Ok(());
            }
        }
    }

    /// Spawns the reaper on the current tokio runtime.
    ///
    /// Every `interval` the reaper applies the configured retention policy
    /// to this writer's archives. Failed passes are sent on the returned
    /// channel, which closes once `token` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval` is zero or no tokio runtime is
    /// running.
    pub fn start_reaper(
        &self,
        token: CancellationToken,
        interval: Duration,
    ) -> LogResult<mpsc::Receiver<LogError>> {
        Ok(self.reaper().spawn(token, interval)?.into_errors())
    }

    /// Returns a reaper for this writer's archives.
    #[must_use]
    pub fn reaper(&self) -> Reaper {
        Reaper::new(&self.config.path, self.config.retention())
    }

    /// Returns the live file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Returns the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of successful rotations since the writer was opened.
    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.cell.rotations()
    }

    /// Bytes accounted to the live segment.
    ///
    /// Includes writes that crossed the threshold and were forwarded, so it
    /// can briefly exceed the file size during a rotation.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.cell.load().written()
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cell.is_closed()
    }
}

impl std::fmt::Debug for RotatingWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("path", &self.config.path)
            .field("max_size_bytes", &self.config.max_size_bytes)
            .field("rotations", &self.rotations())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl io::Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingWriter::flush(self).map_err(Into::into)
    }
}

impl io::Write for &RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingWriter::flush(self).map_err(Into::into)
    }
}
