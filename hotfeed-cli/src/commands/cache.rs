//! Cache command - durable tier maintenance.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::commands::AppContext;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the cache command.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Cache action.
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache actions.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Print the durable cache directory.
    Path,
    /// Delete every durable cache record.
    Clear,
}

/// Runs the cache command.
pub async fn run(args: &CacheArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli)?;
    let file = ctx.cache.file();

    match args.action {
        CacheAction::Path => match cli.format {
            OutputFormat::Text => println!("{}", file.dir().display()),
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({ "dir": file.dir(), "ttlSecs": file.ttl().as_secs() })
            ),
        },
        CacheAction::Clear => {
            let removed = file
                .clear()
                .await
                .with_context(|| format!("clearing {}", file.dir().display()))?;
            match cli.format {
                OutputFormat::Text if !cli.quiet => {
                    println!("Removed {removed} cache records from {}", file.dir().display());
                }
                OutputFormat::Text => {}
                OutputFormat::Json => println!("{}", serde_json::json!({ "removed": removed })),
            }
        }
    }

    Ok(ExitCode::Success)
}
