//! Test fixtures for log directories.
//!
//! [`LogDir`] owns a temporary directory holding one live log file and
//! whatever the writer and tests put next to it.

use logroll_core::{compress_file, Config, RotatingWriter};
use logroll_storage::naming::{self, ArchiveEntry};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

/// Default live file name.
pub const DEFAULT_LOG_NAME: &str = "test.log";

/// A temporary log directory with automatic cleanup.
pub struct LogDir {
    dir: TempDir,
    file_name: String,
}

impl LogDir {
    /// Creates an empty directory for `test.log`.
    pub fn new() -> Self {
        Self::with_name(DEFAULT_LOG_NAME)
    }

    /// Creates an empty directory for a live file named `file_name`.
    pub fn with_name(file_name: &str) -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
            file_name: file_name.to_string(),
        }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Live file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Live file path.
    pub fn live_path(&self) -> PathBuf {
        self.dir.path().join(&self.file_name)
    }

    /// Configuration for the live file with inline archiving.
    pub fn config(&self, max_size_bytes: u64) -> Config {
        Config::new()
            .path(self.live_path())
            .max_size_bytes(max_size_bytes)
            .synchronous_archiving(true)
    }

    /// Opens a writer with inline archiving.
    pub fn writer(&self, max_size_bytes: u64) -> RotatingWriter {
        RotatingWriter::open(self.config(max_size_bytes)).expect("Failed to open writer")
    }

    /// Opens a shareable writer with inline archiving.
    pub fn shared_writer(&self, max_size_bytes: u64) -> Arc<RotatingWriter> {
        Arc::new(self.writer(max_size_bytes))
    }

    /// Writes `contents` as the live file, as if left by an earlier run.
    pub fn seed_live(&self, contents: &[u8]) {
        fs::write(self.live_path(), contents).expect("Failed to seed live file");
    }

    /// Creates a real archive whose name records `rotated_at`.
    pub fn plant_archive(&self, rotated_at: SystemTime) -> PathBuf {
        let nanos = naming::unix_nanos(rotated_at).expect("Time before epoch");
        let pending = naming::pending_path(&self.live_path(), nanos);
        fs::write(&pending, format!("rotated at {nanos}\n")).expect("Failed to write pending");
        compress_file(&pending).expect("Failed to compress planted archive")
    }

    /// Creates a real archive rotated `age` ago.
    pub fn plant_aged_archive(&self, age: Duration) -> PathBuf {
        self.plant_archive(SystemTime::now() - age)
    }

    /// Sorted names of everything in the directory.
    pub fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path())
            .expect("Failed to read log directory")
            .map(|entry| {
                entry
                    .expect("Failed to read entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    /// Archives of the live file, sorted by name.
    pub fn archives(&self) -> Vec<ArchiveEntry> {
        let mut archives: Vec<ArchiveEntry> = self
            .entries()
            .iter()
            .filter_map(|name| naming::match_archive(&self.file_name, name))
            .collect();
        archives.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        archives
    }

    /// Rotated files that have not been compressed yet.
    pub fn pending(&self) -> Vec<String> {
        let prefix = format!("{}.", self.file_name);
        self.entries()
            .into_iter()
            .filter(|name| {
                name.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            })
            .collect()
    }

    /// Live file contents.
    pub fn read_live(&self) -> Vec<u8> {
        fs::read(self.live_path()).expect("Failed to read live file")
    }

    /// Every byte the writer has produced: all archive entries in name
    /// order, then pending files, then the live file.
    pub fn all_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for archive in self.archives() {
            bytes.extend(read_archive(&self.path().join(&archive.file_name)));
        }
        for pending in self.pending() {
            bytes.extend(fs::read(self.path().join(pending)).expect("Failed to read pending"));
        }
        if self.live_path().exists() {
            bytes.extend(self.read_live());
        }
        bytes
    }

    /// Polls until `count` archives exist and nothing is pending.
    pub fn wait_for_archives(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.archives().len() >= count && self.pending().is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Default for LogDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the single entry of an archive.
pub fn read_archive(path: &Path) -> Vec<u8> {
    let file = File::open(path).expect("Failed to open archive");
    let mut zip = zip::ZipArchive::new(file).expect("Not a zip archive");
    assert_eq!(zip.len(), 1, "archive should hold exactly one entry");
    let mut entry = zip.by_index(0).expect("Failed to read entry");
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).expect("Failed to decompress entry");
    contents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_directory() {
        let dir = LogDir::new();
        assert!(dir.entries().is_empty());
        assert!(dir.archives().is_empty());
        assert_eq!(dir.live_path().file_name().unwrap(), DEFAULT_LOG_NAME);
    }

    #[test]
    fn test_plant_archive() {
        let dir = LogDir::with_name("agent.log");
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let path = dir.plant_archive(at);

        assert_eq!(dir.entries(), vec!["agent.log.1700000000000000000.zip".to_string()]);
        assert_eq!(dir.archives()[0].rotated_at(), Some(at));
        assert_eq!(read_archive(&path), b"rotated at 1700000000000000000\n");
    }

    #[test]
    fn test_pending_detection() {
        let dir = LogDir::new();
        dir.seed_live(b"live");
        fs::write(dir.path().join("test.log.42"), b"pending").unwrap();
        fs::write(dir.path().join("test.log.42.zip.tmp"), b"partial").unwrap();

        assert_eq!(dir.pending(), vec!["test.log.42".to_string()]);
        assert!(dir.archives().is_empty());
    }
}
