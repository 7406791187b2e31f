//! Append-mode log files.

use crate::error::{StorageError, StorageResult};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Permission bits for newly created log files on Unix.
#[cfg(unix)]
const LOG_FILE_MODE: u32 = 0o600;

/// A log file opened for appending.
///
/// Every write lands at the current end of the file regardless of what
/// other handles have written, which is what lets many producers share one
/// handle. Writes go through `&File`, so `append` only needs `&self`.
///
/// # Durability
///
/// - `flush()` is a no-op for the OS file, kept for symmetry with
///   `io::Write`
/// - `sync()` calls `File::sync_all()` to push data and metadata to disk
///
/// # Example
///
/// ```no_run
/// use logroll_storage::AppendFile;
/// use std::path::Path;
///
/// let file = AppendFile::open(Path::new("service.log")).unwrap();
/// file.append(b"started\n").unwrap();
/// file.close().unwrap();
/// ```
#[derive(Debug)]
pub struct AppendFile {
    path: PathBuf,
    file: File,
}

impl AppendFile {
    /// Opens or creates the file at `path` in append mode.
    ///
    /// New files are created with mode `0600` on Unix.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(LOG_FILE_MODE);
        }

        let file = options.open(path).map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Returns the path the file was opened at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends all of `data` to the end of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn append(&self, data: &[u8]) -> StorageResult<()> {
        (&self.file).write_all(data)?;
        Ok(())
    }

    /// Flushes buffered data to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&self) -> StorageResult<()> {
        (&self.file).flush()?;
        Ok(())
    }

    /// Syncs data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Returns the current on-disk size of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub fn size(&self) -> StorageResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Closes the file, surfacing any error a final sync reports.
    ///
    /// Dropping an `AppendFile` also closes it, but silently.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails. The handle is released
    /// either way.
    pub fn close(self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Returns the size of an existing file, or 0 if nothing exists at `path`.
///
/// # Errors
///
/// Returns [`StorageError::Stat`] for any failure other than not-found.
pub fn existing_len(path: &Path) -> StorageResult<u64> {
    match std::fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(source) => Err(StorageError::Stat {
            path: path.to_path_buf(),
            source,
        }),
    }
}
