//! Benchmark utilities.

use logroll_core::{Config, RotatingWriter};
use tempfile::TempDir;

/// A log line of `size` bytes ending in a newline.
pub fn log_line(size: usize) -> Vec<u8> {
    let mut line: Vec<u8> = (0..size.saturating_sub(1))
        .map(|i| b'a' + (i % 26) as u8)
        .collect();
    line.push(b'\n');
    line
}

/// Text that compresses like real logs: repeated structure, varying fields.
pub fn log_text(bytes: usize) -> Vec<u8> {
    let mut text = Vec::with_capacity(bytes + 128);
    let mut i = 0u64;
    while text.len() < bytes {
        text.extend_from_slice(
            format!("2024-01-01T00:00:{:02}Z INFO request id={i} status=200 latency_ms={}\n", i % 60, i % 97)
                .as_bytes(),
        );
        i += 1;
    }
    text.truncate(bytes);
    text
}

/// Opens a writer in a fresh temporary directory.
///
/// The directory is returned so it outlives the writer.
pub fn temp_writer(max_size_bytes: u64, synchronous_archiving: bool) -> (TempDir, RotatingWriter) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let writer = RotatingWriter::open(
        Config::new()
            .path(dir.path().join("bench.log"))
            .max_size_bytes(max_size_bytes)
            .synchronous_archiving(synchronous_archiving),
    )
    .expect("Failed to open writer");
    (dir, writer)
}
