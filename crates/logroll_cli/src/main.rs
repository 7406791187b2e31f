//! logroll CLI
//!
//! Command-line front end for rotating logs.
//!
//! # Commands
//!
//! - `pipe` - Copy standard input into a rotating log while reaping archives
//! - `reap` - Apply the retention policy once
//! - `version` - Show version information

mod commands;
mod error;
mod settings;
mod units;

use clap::{Parser, Subcommand};
use settings::LogArgs;
use tracing_subscriber::EnvFilter;

/// Size-rotating log files with compressed archives and retention.
#[derive(Parser)]
#[command(name = "logroll")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy standard input into a rotating log
    Pipe {
        #[command(flatten)]
        log: LogArgs,

        /// How often to reap archives, e.g. "1m" [default: 1m]
        #[arg(long)]
        reap_interval: Option<String>,

        /// Compress rotated files before the rotating write returns
        #[arg(long)]
        sync_archive: bool,
    },

    /// Delete archives outside the retention policy
    Reap {
        #[command(flatten)]
        log: LogArgs,

        /// Only list matching archives
        #[arg(short, long)]
        dry_run: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout may be someone's data.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Pipe {
            log,
            reap_interval,
            sync_archive,
        } => {
            let mut settings = log.resolve(reap_interval.as_deref())?;
            settings.config = settings.config.synchronous_archiving(sync_archive);
            commands::pipe::run(settings)?;
        }
        Commands::Reap {
            log,
            dry_run,
            format,
        } => {
            let settings = log.resolve(None)?;
            commands::reap::run(&settings, dry_run, &format)?;
        }
        Commands::Version => {
            println!("logroll CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("logroll Core v{}", logroll_core::VERSION);
        }
    }

    Ok(())
}
