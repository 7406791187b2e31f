//! Stress helpers for concurrent writers.
//!
//! These drive one [`RotatingWriter`] from many threads at once, released
//! together by a barrier so writes pile up on the rotation threshold.

use logroll_core::RotatingWriter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total writes attempted.
    pub total_ops: usize,
    /// Writes that returned `Ok`.
    pub successful_ops: usize,
    /// Writes that returned an error.
    pub failed_ops: usize,
    /// Rotations the writer performed during the run.
    pub rotations: u64,
    /// Total duration.
    pub duration: Duration,
    /// Writes per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, rotations: u64, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            rotations,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total writes: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Rotations: {}", self.rotations);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} writes/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent writer threads.
    pub threads: usize,
    /// Writes issued by each thread.
    pub writes_per_thread: usize,
    /// Bytes per write.
    pub payload_size: usize,
}

impl StressConfig {
    /// Total bytes issued by a run.
    pub fn total_bytes(&self) -> u64 {
        (self.threads * self.writes_per_thread * self.payload_size) as u64
    }

    /// Rotations a run must produce against `max_size_bytes`, given that
    /// every write has the same size.
    pub fn expected_rotations(&self, max_size_bytes: u64) -> u64 {
        let payload = self.payload_size.max(1) as u64;
        let per_segment = (max_size_bytes / payload).max(1);
        let writes = (self.threads * self.writes_per_thread) as u64;
        writes.div_ceil(per_segment).saturating_sub(1)
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            writes_per_thread: 1_000,
            payload_size: 128,
        }
    }
}

/// Runs a concurrent write stress test.
pub fn stress_concurrent_writes(
    writer: Arc<RotatingWriter>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(config.threads));
    let rotations_before = writer.rotations();

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let writer = Arc::clone(&writer);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let barrier = Arc::clone(&barrier);
            let payload = vec![b'a' + (t % 26) as u8; config.payload_size];
            let writes = config.writes_per_thread;

            thread::spawn(move || {
                barrier.wait();
                for _ in 0..writes {
                    match writer.write(&payload) {
                        Ok(_) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        writer.rotations() - rotations_before,
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::LogDir;

    #[test]
    fn test_expected_rotations() {
        let config = StressConfig {
            threads: 100,
            writes_per_thread: 1,
            payload_size: 512,
        };
        assert_eq!(config.expected_rotations(1024), 49);
        assert_eq!(config.total_bytes(), 51_200);
    }

    #[test]
    fn test_concurrent_writes() {
        let dir = LogDir::new();
        let writer = dir.shared_writer(4096);
        let config = StressConfig {
            threads: 4,
            writes_per_thread: 100,
            payload_size: 64,
        };

        let result = stress_concurrent_writes(writer, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 400);
        assert_eq!(result.rotations, config.expected_rotations(4096));
    }
}
