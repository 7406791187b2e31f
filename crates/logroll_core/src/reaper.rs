//! Retention: deleting archives by age and count.
//!
//! A reap pass lists the directory of the live file, keeps the names that
//! match `<file_name>.<digits>.zip`, and then applies two filters in order:
//!
//! 1. **Age**: archives whose embedded timestamp plus `max_age` is before
//!    now are deleted. Archives removed here do not count toward the second
//!    filter.
//! 2. **Count**: if more than `max_files` archives remain, the excess is
//!    deleted according to [`KeepOrder`].
//!
//! The live file and pending (not yet compressed) files never match the
//! pattern and are never touched.

use crate::config::{KeepOrder, RetentionPolicy};
use crate::error::{LogError, LogResult};
use logroll_storage::naming::{self, ArchiveEntry};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Capacity of the error stream.
const ERROR_BUFFER: usize = 1;

/// What a reap pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Archives that matched the naming pattern.
    pub scanned: usize,
    /// Archives removed by the age filter.
    pub expired: Vec<PathBuf>,
    /// Archives removed by the count filter.
    pub excess: Vec<PathBuf>,
}

impl ReapReport {
    /// Total number of archives removed.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.expired.len() + self.excess.len()
    }
}

/// Applies a [`RetentionPolicy`] to the archives of one live file.
#[derive(Debug, Clone)]
pub struct Reaper {
    live: PathBuf,
    policy: RetentionPolicy,
}

impl Reaper {
    /// Creates a reaper for the archives of `live`.
    pub fn new(live: impl Into<PathBuf>, policy: RetentionPolicy) -> Self {
        Self {
            live: live.into(),
            policy,
        }
    }

    /// Returns the retention policy.
    #[must_use]
    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Directory holding the live file and its archives.
    #[must_use]
    pub fn directory(&self) -> &Path {
        match self.live.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn live_file_name(&self) -> LogResult<&str> {
        self.live
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                LogError::invalid_config(format!(
                    "log path has no usable file name: {}",
                    self.live.display()
                ))
            })
    }

    /// Lists the archives of the live file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn scan(&self) -> LogResult<Vec<ArchiveEntry>> {
        let live_name = self.live_file_name()?;
        let mut archives = Vec::new();
        for entry in fs::read_dir(self.directory())? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if let Some(archive) = naming::match_archive(live_name, &name) {
                archives.push(archive);
            }
        }
        Ok(archives)
    }

    /// Runs one pass against the current time.
    ///
    /// # Errors
    ///
    /// See [`reap_at`](Self::reap_at).
    pub fn reap(&self) -> LogResult<ReapReport> {
        self.reap_at(SystemTime::now())
    }

    /// Runs one pass as if the current time were `now`.
    ///
    /// Every qualifying archive is attempted even if an earlier removal
    /// fails; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or an archive
    /// cannot be removed.
    pub fn reap_at(&self, now: SystemTime) -> LogResult<ReapReport> {
        let archives = self.scan()?;
        let dir = self.directory();
        let mut report = ReapReport {
            scanned: archives.len(),
            ..ReapReport::default()
        };
        if self.policy.is_unbounded() {
            return Ok(report);
        }

        let mut first_error: Option<LogError> = None;
        let mut remove = |name: &str, removed: &mut Vec<PathBuf>| {
            let path = dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(err) => {
                    first_error.get_or_insert(LogError::Io(err));
                }
            }
        };

        let mut survivors = Vec::with_capacity(archives.len());
        for archive in archives {
            if is_expired(&archive, self.policy.max_age, now) {
                remove(&archive.file_name, &mut report.expired);
            } else {
                survivors.push(archive);
            }
        }

        let keep = usize::try_from(self.policy.max_files).unwrap_or(usize::MAX);
        if self.policy.max_files > 0 && survivors.len() > keep {
            order_for_keeping(&mut survivors, self.policy.keep_order);
            for archive in &survivors[keep..] {
                remove(&archive.file_name, &mut report.excess);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Spawns the periodic reap loop on the current tokio runtime.
    ///
    /// The first pass runs one `interval` after spawning. Failed passes are
    /// sent on the handle's error stream; when the stream's buffer is full
    /// the loop waits for the consumer (or cancellation). Cancelling `token`
    /// ends the loop and closes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval` is zero or no tokio runtime is
    /// running.
    pub fn spawn(self, token: CancellationToken, interval: Duration) -> LogResult<ReaperHandle> {
        if interval.is_zero() {
            return Err(LogError::invalid_config("reap interval must be non-zero"));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| LogError::reaper_stopped(format!("no tokio runtime: {err}")))?;

        let (errors_tx, errors_rx) = mpsc::channel(ERROR_BUFFER);
        let task = runtime.spawn(self.run(token, interval, errors_tx));
        Ok(ReaperHandle {
            errors: errors_rx,
            task,
        })
    }

    async fn run(
        self,
        token: CancellationToken,
        interval: Duration,
        errors: mpsc::Sender<LogError>,
    ) {
        info!(
            path = %self.live.display(),
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "reaper started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let reaper = self.clone();
            let outcome = match tokio::task::spawn_blocking(move || reaper.reap()).await {
                Ok(outcome) => outcome,
                Err(err) => Err(LogError::reaper_stopped(err.to_string())),
            };

            match outcome {
                Ok(report) if report.removed() > 0 => debug!(
                    scanned = report.scanned,
                    expired = report.expired.len(),
                    excess = report.excess.len(),
                    "reaped archives"
                ),
                Ok(report) => trace!(scanned = report.scanned, "nothing to reap"),
                Err(err) => {
                    warn!(error = %err, "reap pass failed");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        sent = errors.send(err) => {
                            if sent.is_err() {
                                trace!("reaper error stream has no receiver");
                            }
                        }
                    }
                }
            }
        }

        info!(path = %self.live.display(), "reaper stopped");
    }
}

/// A running reap loop.
#[derive(Debug)]
pub struct ReaperHandle {
    errors: mpsc::Receiver<LogError>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Receives the next reap error, or `None` once the loop has stopped.
    pub async fn next_error(&mut self) -> Option<LogError> {
        self.errors.recv().await
    }

    /// Returns the error stream, detaching the task.
    #[must_use]
    pub fn into_errors(self) -> mpsc::Receiver<LogError> {
        self.errors
    }

    /// Waits for the loop to finish after cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the task panicked or was aborted.
    pub async fn join(self) -> LogResult<()> {
        self.task
            .await
            .map_err(|err| LogError::reaper_stopped(err.to_string()))
    }
}

/// `timestamp + max_age < now`. Zero `max_age` and unparseable timestamps
/// never expire.
fn is_expired(archive: &ArchiveEntry, max_age: Duration, now: SystemTime) -> bool {
    if max_age.is_zero() {
        return false;
    }
    archive
        .rotated_at()
        .and_then(|rotated| rotated.checked_add(max_age))
        .is_some_and(|deadline| deadline < now)
}

/// Sorts so that the archives to keep come first.
fn order_for_keeping(archives: &mut [ArchiveEntry], order: KeepOrder) {
    match order {
        KeepOrder::Lexical => archives.sort_by(|a, b| a.file_name.cmp(&b.file_name)),
        KeepOrder::Newest => archives.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.file_name.cmp(&a.file_name))
        }),
    }
}
