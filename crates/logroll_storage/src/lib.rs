//! # logroll Storage
//!
//! File-level primitives for logroll.
//!
//! This crate provides the lowest-level pieces the rotating writer is built
//! from. Nothing here knows about size thresholds, rotation barriers or
//! retention; those live in `logroll_core`.
//!
//! ## Design Principles
//!
//! - Files are opened in append mode and written through shared references,
//!   so many threads can append to one handle without a lock
//! - Renaming is a capability ([`Renamer`]) rather than a hardwired call, so
//!   tests can inject failing or delayed renames
//! - The on-disk naming convention is defined in exactly one place
//!   ([`naming`])
//!
//! ## Example
//!
//! ```rust
//! use logroll_storage::{naming, AppendFile};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("app.log");
//!
//! let file = AppendFile::open(&path).unwrap();
//! file.append(b"hello world\n").unwrap();
//! assert_eq!(file.size().unwrap(), 12);
//!
//! let pending = naming::pending_path(&path, 1_700_000_000_000_000_000);
//! assert!(pending.to_string_lossy().ends_with("app.log.1700000000000000000"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
pub mod naming;
mod rename;

pub use error::{StorageError, StorageResult};
pub use file::{existing_len, AppendFile};
pub use naming::{ArchiveEntry, ARCHIVE_EXTENSION};
pub use rename::{FsRenamer, Renamer};
