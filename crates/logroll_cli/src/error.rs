//! CLI error type.

use logroll_core::LogError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by `logroll` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A size string did not parse or was zero.
    #[error("invalid max size: {0}")]
    InvalidSize(String),

    /// A duration string did not parse.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// The settings file could not be read.
    #[error("error reading config file {}: {source}", path.display())]
    SettingsRead {
        /// Settings file path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The settings file is not a regular file.
    #[error("error reading config file {}: not a regular file", path.display())]
    SettingsNotFile {
        /// Settings file path.
        path: PathBuf,
    },

    /// The settings file is not valid JSON for the expected shape.
    #[error("error parsing config file {}: {source}", path.display())]
    SettingsParse {
        /// Settings file path.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// Error from the rotating writer or reaper.
    #[error(transparent)]
    Log(#[from] LogError),

    /// I/O error outside the writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Output serialization failed.
    #[error("cannot encode output: {0}")]
    Output(#[from] serde_json::Error),
}
