//! Error types for logroll core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur while writing, rotating, archiving or reaping.
#[derive(Debug, Error)]
pub enum LogError {
    /// Storage primitive error.
    #[error("storage error: {0}")]
    Storage(#[from] logroll_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Writing the compressed archive failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Retiring the current segment failed. Returned to the caller whose
    /// write triggered the rotation.
    #[error("error rotating log: {message}")]
    Rotation {
        /// Description of the failed step.
        message: String,
    },

    /// A rotation raced by this caller did not produce a replacement.
    #[error("error rotating log")]
    RotationFailed,

    /// The writer has been closed.
    #[error("log writer is closed")]
    Closed,

    /// The configuration cannot be used.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// The reaper task ended abnormally.
    #[error("reaper stopped: {message}")]
    ReaperStopped {
        /// Description of why the task ended.
        message: String,
    },
}

impl LogError {
    /// Creates a rotation error.
    pub fn rotation(message: impl Into<String>) -> Self {
        Self::Rotation {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a reaper stopped error.
    pub fn reaper_stopped(message: impl Into<String>) -> Self {
        Self::ReaperStopped {
            message: message.into(),
        }
    }

    /// Returns true if the error came from the rotation path.
    #[must_use]
    pub fn is_rotation(&self) -> bool {
        matches!(self, Self::Rotation { .. } | Self::RotationFailed)
    }
}

impl From<LogError> for io::Error {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Io(err) => err,
            LogError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
            LogError::InvalidConfig { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
