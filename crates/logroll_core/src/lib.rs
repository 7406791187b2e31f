//! # logroll Core
//!
//! A log sink that many threads write to concurrently and that rolls its
//! file over once it reaches a size threshold.
//!
//! This crate provides:
//! - [`RotatingWriter`]: concurrent appends with at-most-once rotation per
//!   file
//! - [`Archiver`]: compression of rotated files into `.zip` archives
//! - [`Reaper`]: age and count based deletion of old archives, runnable as
//!   a periodic tokio task
//!
//! ## On-disk layout
//!
//! ```text
//! app.log                      live file
//! app.log.<unixNanos>          rotated, waiting to be compressed
//! app.log.<unixNanos>.zip      archive, subject to retention
//! ```
//!
//! ## Example
//!
//! ```rust
//! use logroll_core::{Config, RotatingWriter};
//! use std::io::Write;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let writer = RotatingWriter::open(
//!     Config::new()
//!         .path(dir.path().join("service.log"))
//!         .max_size_bytes(64)
//!         .synchronous_archiving(true),
//! )
//! .unwrap();
//!
//! let mut sink = &writer;
//! for i in 0..10 {
//!     writeln!(sink, "request {i} handled").unwrap();
//! }
//! assert!(writer.rotations() > 0);
//!
//! let archives = writer.reaper().scan().unwrap();
//! assert_eq!(archives.len() as u64, writer.rotations());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod archiver;
mod config;
mod error;
mod reaper;
mod segment;
mod writer;

pub use archiver::{compress_file, ArchiveMode, Archiver};
pub use config::{Config, KeepOrder, RetentionPolicy, DEFAULT_MAX_SIZE_BYTES};
pub use error::{LogError, LogResult};
pub use reaper::{ReapReport, Reaper, ReaperHandle};
pub use writer::RotatingWriter;

pub use logroll_storage::{ArchiveEntry, FsRenamer, Renamer};
pub use tokio_util::sync::CancellationToken;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
