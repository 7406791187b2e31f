//! On-disk naming convention for rotated files.
//!
//! ```text
//! <path>                      # live file, never touched by retention
//! <path>.<unixNanos>          # rotated, waiting to be compressed
//! <path>.<unixNanos>.zip.tmp  # archive being written
//! <path>.<unixNanos>.zip      # final archive
//! ```
//!
//! External tooling globs these names, so they must stay bit-exact.

use crate::error::{StorageError, StorageResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Extension of finished archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Suffix of archives that are still being written.
const TEMP_SUFFIX: &str = ".tmp";

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Returns the rotated-but-not-yet-archived path for `live` at `timestamp_nanos`.
#[must_use]
pub fn pending_path(live: &Path, timestamp_nanos: u64) -> PathBuf {
    with_suffix(live, &format!(".{timestamp_nanos}"))
}

/// Returns the final archive path for a pending file.
#[must_use]
pub fn archive_path(pending: &Path) -> PathBuf {
    with_suffix(pending, &format!(".{ARCHIVE_EXTENSION}"))
}

/// Returns the in-progress archive path for a pending file.
#[must_use]
pub fn temp_archive_path(pending: &Path) -> PathBuf {
    with_suffix(pending, &format!(".{ARCHIVE_EXTENSION}{TEMP_SUFFIX}"))
}

/// Nanoseconds since the Unix epoch for `time`.
///
/// # Errors
///
/// Returns [`StorageError::ClockBeforeEpoch`] if `time` precedes the epoch.
pub fn unix_nanos(time: SystemTime) -> StorageResult<u64> {
    let nanos = time
        .duration_since(UNIX_EPOCH)
        .map_err(|_| StorageError::ClockBeforeEpoch)?
        .as_nanos();
    // u64 nanoseconds run out in 2554.
    Ok(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// A directory entry that matches the archive pattern of a live file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File name within the log directory.
    pub file_name: String,
    /// Embedded rotation time in nanoseconds since the epoch.
    ///
    /// `None` when the digits do not fit in a `u64`. Such entries still
    /// match the pattern but cannot be judged by age.
    pub timestamp: Option<u64>,
}

impl ArchiveEntry {
    /// Rotation time as a `SystemTime`, if the timestamp parsed.
    #[must_use]
    pub fn rotated_at(&self) -> Option<SystemTime> {
        self.timestamp
            .map(|nanos| UNIX_EPOCH + std::time::Duration::from_nanos(nanos))
    }
}

/// Matches `candidate` against `<live_file_name>.<digits>.zip`.
///
/// Only file names are compared; both arguments must be bare names from
/// the same directory.
#[must_use]
pub fn match_archive(live_file_name: &str, candidate: &str) -> Option<ArchiveEntry> {
    let digits = candidate
        .strip_prefix(live_file_name)?
        .strip_prefix('.')?
        .strip_suffix(ARCHIVE_EXTENSION)?
        .strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(ArchiveEntry {
        file_name: candidate.to_string(),
        timestamp: digits.parse::<u64>().ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn pending_and_archive_names() {
        let live = Path::new("/var/log/agent.log");
        let pending = pending_path(live, 42);
        assert_eq!(pending, Path::new("/var/log/agent.log.42"));
        assert_eq!(archive_path(&pending), Path::new("/var/log/agent.log.42.zip"));
        assert_eq!(
            temp_archive_path(&pending),
            Path::new("/var/log/agent.log.42.zip.tmp")
        );
    }

    #[test]
    fn matches_archive() {
        let entry = match_archive("agent.log", "agent.log.1700000000000000000.zip").unwrap();
        assert_eq!(entry.timestamp, Some(1_700_000_000_000_000_000));
        assert_eq!(entry.file_name, "agent.log.1700000000000000000.zip");
    }

    #[test]
    fn rejects_non_archives() {
        for name in [
            "agent.log",
            "agent.log.123",
            "agent.log.123.zip.tmp",
            "agent.log..zip",
            "agent.log.12a.zip",
            "other.log.123.zip",
            "agent.log.123.gz",
            "xagent.log.123.zip",
        ] {
            assert!(match_archive("agent.log", name).is_none(), "{name}");
        }
    }

    #[test]
    fn oversized_timestamp_still_matches() {
        let entry = match_archive("a.log", "a.log.99999999999999999999999.zip").unwrap();
        assert_eq!(entry.timestamp, None);
        assert_eq!(entry.rotated_at(), None);
    }

    #[test]
    fn rotated_at_round_trips_nanos() {
        let now = SystemTime::now();
        let nanos = unix_nanos(now).unwrap();
        let entry = ArchiveEntry {
            file_name: String::new(),
            timestamp: Some(nanos),
        };
        let back = entry.rotated_at().unwrap();
        let drift = back
            .duration_since(now)
            .unwrap_or_else(|e| e.duration());
        assert!(drift < Duration::from_micros(1));
    }

    #[test]
    fn unix_nanos_before_epoch_fails() {
        let early = UNIX_EPOCH - Duration::from_secs(1);
        assert!(matches!(
            unix_nanos(early),
            Err(StorageError::ClockBeforeEpoch)
        ));
    }

    proptest! {
        #[test]
        fn pending_archive_names_match(ts in any::<u64>()) {
            let live = Path::new("svc.log");
            let archive = archive_path(&pending_path(live, ts));
            let name = archive.file_name().unwrap().to_str().unwrap();
            let entry = match_archive("svc.log", name);
            prop_assert_eq!(entry.and_then(|e| e.timestamp), Some(ts));
        }
    }
}
