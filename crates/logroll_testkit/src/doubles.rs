//! Renamer test doubles.
//!
//! Rotation renames the live file through a [`Renamer`], so tests can make
//! that step fail, count it, or slow it down to widen race windows.

use logroll_storage::{FsRenamer, Renamer};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Succeeds a fixed number of times, then fails every rename.
#[derive(Debug)]
pub struct FailingRenamer {
    successes_left: AtomicU64,
    attempts: AtomicU64,
}

impl FailingRenamer {
    /// Fails every rename.
    pub fn always() -> Self {
        Self::after(0)
    }

    /// Renames for real `successes` times, then fails.
    pub fn after(successes: u64) -> Self {
        Self {
            successes_left: AtomicU64::new(successes),
            attempts: AtomicU64::new(0),
        }
    }

    /// Number of renames attempted so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Renamer for FailingRenamer {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let granted = self
            .successes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if granted {
            FsRenamer.rename(from, to)
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected rename failure",
            ))
        }
    }
}

/// Renames for real and counts the calls.
#[derive(Debug, Default)]
pub struct CountingRenamer {
    calls: AtomicU64,
}

impl CountingRenamer {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of renames performed.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Renamer for CountingRenamer {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FsRenamer.rename(from, to)
    }
}

/// Sleeps before every real rename.
#[derive(Debug)]
pub struct SlowRenamer {
    delay: Duration,
    calls: AtomicU64,
}

impl SlowRenamer {
    /// Delays each rename by `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicU64::new(0),
        }
    }

    /// Number of renames performed.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Renamer for SlowRenamer {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::thread::sleep(self.delay);
        self.calls.fetch_add(1, Ordering::SeqCst);
        FsRenamer.rename(from, to)
    }
}

/// Renames for real, then deletes the renamed file, so anything that
/// expects to find it afterwards (such as the archiver) fails.
#[derive(Debug, Default)]
pub struct DiscardingRenamer {
    calls: AtomicU64,
}

impl DiscardingRenamer {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of renames performed.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Renamer for DiscardingRenamer {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FsRenamer.rename(from, to)?;
        std::fs::remove_file(to)
    }
}
