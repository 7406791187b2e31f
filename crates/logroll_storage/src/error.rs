//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A log file could not be opened or created.
    #[error("cannot open {}: {source}", path.display())]
    Open {
        /// The path that was being opened.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// A log file could not be inspected.
    #[error("cannot stat {}: {source}", path.display())]
    Stat {
        /// The path that was being inspected.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// A rename failed.
    #[error("cannot rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The system clock reports a time before the Unix epoch.
    #[error("system time before UNIX epoch")]
    ClockBeforeEpoch,
}
