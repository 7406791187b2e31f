//! Writer settings from flags and an optional JSON file.
//!
//! A settings file looks like:
//!
//! ```json
//! {
//!   "path": "/var/log/agent.log",
//!   "max_size": "128 MB",
//!   "retention_duration": "168h",
//!   "retention_files": 10,
//!   "keep": "newest",
//!   "reap_interval": "1m"
//! }
//! ```
//!
//! Every field is optional. Flags given on the command line win over the
//! file, and the file wins over built-in defaults.

use crate::error::{CliError, CliResult};
use crate::units::{parse_duration, parse_size};
use clap::{Args, ValueEnum};
use logroll_core::{Config, KeepOrder};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default `--max-size`.
pub const DEFAULT_MAX_SIZE: &str = "128 MB";
/// Default `--retention-duration`.
pub const DEFAULT_RETENTION_DURATION: &str = "168h";
/// Default `--retention-files`.
pub const DEFAULT_RETENTION_FILES: u64 = 10;
/// Default `--reap-interval`.
pub const DEFAULT_REAP_INTERVAL: &str = "1m";

/// Which archives the count filter keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keep {
    /// Lexically first archive names.
    Lexical,
    /// Most recent archives.
    Newest,
}

impl From<Keep> for KeepOrder {
    fn from(keep: Keep) -> Self {
        match keep {
            Keep::Lexical => KeepOrder::Lexical,
            Keep::Newest => KeepOrder::Newest,
        }
    }
}

/// Contents of a settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    /// Live log file path.
    pub path: Option<PathBuf>,
    /// Size threshold, e.g. `"128 MB"`.
    pub max_size: Option<String>,
    /// Archive age limit, e.g. `"168h"`.
    pub retention_duration: Option<String>,
    /// Archive count limit.
    pub retention_files: Option<u64>,
    /// Count filter ordering.
    pub keep: Option<Keep>,
    /// Reaper period, e.g. `"1m"`.
    pub reap_interval: Option<String>,
}

impl FileSettings {
    /// Reads and parses a settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a regular file,
    /// or does not parse.
    pub fn load(path: &Path) -> CliResult<Self> {
        let read_err = |source: std::io::Error| CliError::SettingsRead {
            path: path.to_path_buf(),
            source,
        };
        let metadata = fs::metadata(path).map_err(read_err)?;
        if !metadata.is_file() {
            return Err(CliError::SettingsNotFile {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(read_err)?;
        serde_json::from_str(&text).map_err(|source| CliError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Flags shared by every command that addresses a log.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Path of the live log file
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Rotation threshold, e.g. "128 MB" [default: 128 MB]
    #[arg(long)]
    pub max_size: Option<String>,

    /// Delete archives older than this, e.g. "168h"; "0" disables [default: 168h]
    #[arg(long)]
    pub retention_duration: Option<String>,

    /// Keep at most this many archives; 0 disables [default: 10]
    #[arg(long)]
    pub retention_files: Option<u64>,

    /// Which archives the count limit keeps [default: lexical]
    #[arg(long, value_enum)]
    pub keep: Option<Keep>,

    /// JSON settings file
    #[arg(short, long = "config")]
    pub config: Option<PathBuf>,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Writer configuration.
    pub config: Config,
    /// Reaper period.
    pub reap_interval: Duration,
}

impl LogArgs {
    /// Merges flags, the settings file and defaults.
    ///
    /// `reap_interval` is the flag value, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file is unusable or a size or
    /// duration does not parse.
    pub fn resolve(&self, reap_interval: Option<&str>) -> CliResult<Settings> {
        let file = match &self.config {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };
        Self::merge(self, file, reap_interval)
    }

    fn merge(&self, file: FileSettings, reap_interval: Option<&str>) -> CliResult<Settings> {
        let max_size = self
            .max_size
            .as_deref()
            .or(file.max_size.as_deref())
            .unwrap_or(DEFAULT_MAX_SIZE);
        let retention_duration = self
            .retention_duration
            .as_deref()
            .or(file.retention_duration.as_deref())
            .unwrap_or(DEFAULT_RETENTION_DURATION);
        let reap_interval = reap_interval
            .or(file.reap_interval.as_deref())
            .unwrap_or(DEFAULT_REAP_INTERVAL);

        let mut config = Config::new()
            .max_size_bytes(parse_size(max_size)?)
            .retention_duration(parse_duration(retention_duration)?)
            .retention_files(
                self.retention_files
                    .or(file.retention_files)
                    .unwrap_or(DEFAULT_RETENTION_FILES),
            )
            .keep_order(self.keep.or(file.keep).unwrap_or(Keep::Lexical).into());
        if let Some(path) = self.path.clone().or(file.path) {
            config = config.path(path);
        }

        Ok(Settings {
            config: config.resolve(),
            reap_interval: parse_duration(reap_interval)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let settings = LogArgs::default().resolve(None).unwrap();
        assert_eq!(settings.config.max_size_bytes, 134_217_728);
        assert_eq!(
            settings.config.retention_duration,
            Duration::from_secs(168 * 3600)
        );
        assert_eq!(settings.config.retention_files, 10);
        assert_eq!(settings.config.keep_order, KeepOrder::Lexical);
        assert_eq!(settings.reap_interval, Duration::from_secs(60));
    }

    #[test]
    fn flags_override_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("logroll.json");
        fs::write(
            &file,
            r#"{"path": "from-file.log", "max_size": "1 KB", "retention_files": 3, "keep": "newest", "reap_interval": "5s"}"#,
        )
        .unwrap();

        let args = LogArgs {
            max_size: Some("2 KB".to_string()),
            config: Some(file),
            ..LogArgs::default()
        };
        let settings = args.resolve(None).unwrap();

        assert_eq!(settings.config.path, PathBuf::from("from-file.log"));
        assert_eq!(settings.config.max_size_bytes, 2048);
        assert_eq!(settings.config.retention_files, 3);
        assert_eq!(settings.config.keep_order, KeepOrder::Newest);
        assert_eq!(settings.reap_interval, Duration::from_secs(5));

        let settings = args.resolve(Some("250ms")).unwrap();
        assert_eq!(settings.reap_interval, Duration::from_millis(250));
    }

    #[test]
    fn zero_size_rejected() {
        let args = LogArgs {
            max_size: Some("0 MB".to_string()),
            ..LogArgs::default()
        };
        assert!(matches!(args.resolve(None), Err(CliError::InvalidSize(_))));
    }

    #[test]
    fn unusable_settings_files() {
        let dir = tempdir().unwrap();

        let missing = LogArgs {
            config: Some(dir.path().join("missing.json")),
            ..LogArgs::default()
        };
        assert!(matches!(missing.resolve(None), Err(CliError::SettingsRead { .. })));

        let directory = LogArgs {
            config: Some(dir.path().to_path_buf()),
            ..LogArgs::default()
        };
        assert!(matches!(directory.resolve(None), Err(CliError::SettingsNotFile { .. })));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"max_sise": "1 KB"}"#).unwrap();
        let unknown_field = LogArgs {
            config: Some(bad),
            ..LogArgs::default()
        };
        assert!(matches!(unknown_field.resolve(None), Err(CliError::SettingsParse { .. })));
    }
}
