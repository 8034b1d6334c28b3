//! Transcript cache CLI
//!
//! Inspects and manages an on-disk transcript cache: read, seed, delete and
//! wipe entries, and report statistics.

mod commands;
mod config;
mod error;

use crate::commands::{Command, Outcome};
use crate::config::{load_config, Overrides};
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{prelude::*, EnvFilter};
use transcript_cache::ArtifactCache;

#[derive(Debug, Parser)]
#[command(name = "transcript-cache", version, about = "Manage the local transcript cache")]
struct Cli {
    /// Cache directory (overrides CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Entry lifetime in seconds (overrides CACHE_MAX_AGE_SECS)
    #[arg(long, global = true)]
    max_age_secs: Option<u64>,

    /// Size budget in bytes (overrides CACHE_MAX_SIZE)
    #[arg(long, global = true)]
    max_size: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<ExitCode> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("transcript_cache=info".parse()?)
        .add_directive("transcript_cache_cli=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };

    let cli = Cli::parse();

    let config = Overrides {
        cache_dir: cli.cache_dir,
        max_age_secs: cli.max_age_secs,
        max_size: cli.max_size,
    }
    .apply(load_config())?;
    debug!(cache_dir = ?config.cache_dir, "Loaded configuration");

    let cache = ArtifactCache::open(config)?;

    let outcome = commands::run(
        cli.command,
        &cache,
        &mut std::io::stdin().lock(),
        &mut std::io::stdout().lock(),
    )?;

    Ok(match outcome {
        Outcome::Done => ExitCode::SUCCESS,
        Outcome::NotFound => ExitCode::FAILURE,
    })
}
