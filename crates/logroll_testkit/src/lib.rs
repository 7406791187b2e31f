//! # logroll Testkit
//!
//! Test utilities for logroll.
//!
//! This crate provides:
//! - A temporary log directory fixture that can plant aged archives
//! - Renamer test doubles for failure injection and race widening
//! - Property-based generators for write workloads
//! - Concurrent write stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use logroll_testkit::prelude::*;
//!
//! let dir = LogDir::new();
//! let writer = dir.writer(1024);
//! writer.write(&[b'!'; 512]).unwrap();
//! assert_eq!(dir.entries(), vec![dir.file_name().to_string()]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod doubles;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::doubles::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use doubles::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
