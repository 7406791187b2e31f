//! Writer configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default size threshold: 128 MiB.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 1 << 27;

/// Order used by the count-based retention filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepOrder {
    /// Sort surviving archive names lexically ascending and keep the first
    /// `retention_files`.
    ///
    /// For equal-width timestamps this keeps the *oldest* archives, and for
    /// timestamps of differing digit counts lexical order is not
    /// chronological.
    #[default]
    Lexical,
    /// Keep the `retention_files` archives with the most recent embedded
    /// timestamps. Archives whose timestamp does not parse sort as oldest.
    Newest,
}

/// Configuration for a [`crate::RotatingWriter`].
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Path of the live log file. Empty means `<program-name>.log`.
    pub path: PathBuf,

    /// Size threshold that triggers rotation (0 = 128 MiB).
    pub max_size_bytes: u64,

    /// Archives older than this are reaped (zero = disabled).
    pub retention_duration: Duration,

    /// At most this many archives survive a reap (0 = disabled).
    pub retention_files: u64,

    /// Which archives the count filter keeps.
    pub keep_order: KeepOrder,

    /// Compress inline with the rotating write instead of in the background.
    ///
    /// Makes archive errors visible to the rotating caller and the directory
    /// contents deterministic once writes return. Intended for tests; it
    /// puts compression on the write path.
    pub synchronous_archiving: bool,
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the live log file path.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the rotation threshold in bytes.
    #[must_use]
    pub fn max_size_bytes(mut self, size: u64) -> Self {
        self.max_size_bytes = size;
        self
    }

    /// Sets the maximum archive age.
    #[must_use]
    pub fn retention_duration(mut self, duration: Duration) -> Self {
        self.retention_duration = duration;
        self
    }

    /// Sets the maximum number of archives to keep.
    #[must_use]
    pub fn retention_files(mut self, files: u64) -> Self {
        self.retention_files = files;
        self
    }

    /// Sets the count filter ordering.
    #[must_use]
    pub fn keep_order(mut self, order: KeepOrder) -> Self {
        self.keep_order = order;
        self
    }

    /// Sets whether archiving runs inline with rotation.
    #[must_use]
    pub fn synchronous_archiving(mut self, value: bool) -> Self {
        self.synchronous_archiving = value;
        self
    }

    /// Returns a copy with defaults applied to unset fields.
    #[must_use]
    pub fn resolve(&self) -> Self {
        let mut resolved = self.clone();
        if resolved.path.as_os_str().is_empty() {
            resolved.path = default_path();
        }
        if resolved.max_size_bytes == 0 {
            resolved.max_size_bytes = DEFAULT_MAX_SIZE_BYTES;
        }
        resolved
    }

    /// Returns the retention policy described by this configuration.
    #[must_use]
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age: self.retention_duration,
            max_files: self.retention_files,
            keep_order: self.keep_order,
        }
    }
}

/// Age and count limits applied to archives by a reap pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
    /// Maximum archive age (zero = unlimited).
    pub max_age: Duration,
    /// Maximum archive count (0 = unlimited).
    pub max_files: u64,
    /// Which archives the count filter keeps.
    pub keep_order: KeepOrder,
}

impl RetentionPolicy {
    /// Returns true if neither filter is enabled.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.max_age.is_zero() && self.max_files == 0
    }
}

/// `<program-name>.log`, derived from the invoked program path.
fn default_path() -> PathBuf {
    let program = std::env::args_os()
        .next()
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_PKG_NAME")));
    append_log_extension(&program)
}

fn append_log_extension(program: &Path) -> PathBuf {
    let mut name = program.as_os_str().to_owned();
    name.push(".log");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.path.as_os_str().is_empty());
        assert_eq!(config.max_size_bytes, 0);
        assert!(config.retention().is_unbounded());
        assert!(!config.synchronous_archiving);
        assert_eq!(config.keep_order, KeepOrder::Lexical);
    }

    #[test]
    fn resolve_applies_defaults() {
        let resolved = Config::new().resolve();
        assert_eq!(resolved.max_size_bytes, 134_217_728);
        assert!(resolved.path.to_string_lossy().ends_with(".log"));
    }

    #[test]
    fn resolve_keeps_explicit_values() {
        let resolved = Config::new()
            .path("/tmp/agent.log")
            .max_size_bytes(1024)
            .resolve();
        assert_eq!(resolved.path, PathBuf::from("/tmp/agent.log"));
        assert_eq!(resolved.max_size_bytes, 1024);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .retention_duration(Duration::from_secs(3600))
            .retention_files(10)
            .keep_order(KeepOrder::Newest)
            .synchronous_archiving(true);

        let policy = config.retention();
        assert_eq!(policy.max_age, Duration::from_secs(3600));
        assert_eq!(policy.max_files, 10);
        assert_eq!(policy.keep_order, KeepOrder::Newest);
        assert!(!policy.is_unbounded());
        assert!(config.synchronous_archiving);
    }

    #[test]
    fn log_extension_is_appended() {
        assert_eq!(
            append_log_extension(Path::new("/usr/bin/agent")),
            PathBuf::from("/usr/bin/agent.log")
        );
    }
}
