//! CLI command implementations.

pub mod pipe;
pub mod reap;
