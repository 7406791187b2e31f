//! Reap command implementation.

use crate::error::CliResult;
use crate::settings::Settings;
use logroll_core::{ReapReport, Reaper};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of a single reap pass.
#[derive(Debug, Serialize)]
pub struct ReapResult {
    /// Live log file path.
    pub path: String,
    /// Archives that matched the naming pattern.
    pub scanned: usize,
    /// Archives removed for age.
    pub expired: Vec<String>,
    /// Archives removed for count.
    pub excess: Vec<String>,
}

impl ReapResult {
    fn new(live: &Path, report: &ReapReport) -> Self {
        let names = |paths: &[PathBuf]| -> Vec<String> {
            paths.iter().map(|p| p.display().to_string()).collect()
        };
        Self {
            path: live.display().to_string(),
            scanned: report.scanned,
            expired: names(&report.expired),
            excess: names(&report.excess),
        }
    }
}

/// Runs one reap pass and prints what it removed.
pub fn run(settings: &Settings, dry_run: bool, format: &str) -> CliResult<()> {
    let config = &settings.config;
    let reaper = Reaper::new(&config.path, config.retention());

    let result = if dry_run {
        let archives = reaper.scan()?;
        ReapResult {
            path: config.path.display().to_string(),
            scanned: archives.len(),
            expired: Vec::new(),
            excess: Vec::new(),
        }
    } else {
        ReapResult::new(&config.path, &reaper.reap()?)
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result, dry_run),
    }
    Ok(())
}

fn print_text_output(result: &ReapResult, dry_run: bool) {
    println!("Log: {}", result.path);
    println!("Archives scanned: {}", result.scanned);
    if dry_run {
        println!("Dry run: nothing removed");
        return;
    }
    println!("Removed for age: {}", result.expired.len());
    for path in &result.expired {
        println!("  {path}");
    }
    println!("Removed for count: {}", result.excess.len());
    for path in &result.excess {
        println!("  {path}");
    }
}
