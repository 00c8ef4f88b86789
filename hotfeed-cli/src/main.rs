// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `HotFeed` CLI - hot-list aggregation from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Fetch every configured source (cached for 30 minutes)
//! hotfeed
//!
//! # One source, bypassing the cache
//! hotfeed fetch --source weibo --force
//!
//! # Top 10 per source, exported to a file
//! hotfeed fetch --top 10 --output out/hot.json
//!
//! # List sources
//! hotfeed list
//!
//! # Live health check of every source
//! hotfeed check
//!
//! # Run the generation provider chain
//! hotfeed generate "Summarize today's headlines" --stream
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{cache, check, fetch, generate, list};

// ============================================================================
// CLI Definition
// ============================================================================

/// `HotFeed` CLI - hot-list aggregation.
#[derive(Parser)]
#[command(name = "hotfeed")]
#[command(about = "Hot-list aggregation with tiered caching")]
#[command(long_about = r#"
HotFeed fetches trending lists from configured JSON sources, caches them
in memory and on disk, and can pass prompts through a primary/secondary
generation provider chain.

Sources and providers are configured in <config_dir>/hotfeed/config.yaml.

Examples:
  hotfeed                          # Fetch all sources
  hotfeed fetch -s weibo           # Single source
  hotfeed fetch --force --top 10   # Refresh, show 10 per source
  hotfeed list                     # Registered sources
  hotfeed check                    # Live health check
"#)]
#[command(version)]
#[command(author = "HotFeed Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, runs 'fetch' for all sources.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Configuration file (defaults to <config_dir>/hotfeed/config.yaml).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch items from one or all sources (default if no command specified).
    #[command(visible_alias = "f")]
    Fetch(fetch::FetchArgs),

    /// List registered sources.
    #[command(visible_alias = "l")]
    List,

    /// Fetch every source live and report which ones work.
    Check,

    /// Send a prompt through the generation provider chain.
    #[command(visible_alias = "g")]
    Generate(generate::GenerateArgs),

    /// Inspect or clear the durable cache.
    Cache(cache::CacheArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Requested source is not registered.
    UnknownSource = 2,
    /// Every requested source failed to fetch.
    SourcesFailed = 3,
    /// Every generation provider failed.
    GenerationFailed = 4,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over the verbosity flags.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("hotfeed=debug,info")
        } else {
            EnvFilter::new("hotfeed=warn")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result: Result<ExitCode> = match &cli.command {
        Some(Commands::Fetch(args)) => fetch::run(args, &cli).await,
        Some(Commands::List) => list::run(&cli),
        Some(Commands::Check) => check::run(&cli).await,
        Some(Commands::Generate(args)) => generate::run(args, &cli).await,
        Some(Commands::Cache(args)) => cache::run(args, &cli).await,
        None => fetch::run(&fetch::FetchArgs::default(), &cli).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::Error
        }
    };

    if code != ExitCode::Success {
        std::process::exit(code as i32);
    }
}
