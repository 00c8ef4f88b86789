//! Fetch command - resolve one or all sources through the cache.

use anyhow::{Context, Result};
use clap::Args;
use hotfeed_sources::{OrchestratorError, SourceOutcome};
use hotfeed_store::save_json;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::commands::AppContext;
use crate::output::{JsonFormatter, TextFormatter, export_value};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the fetch command.
#[derive(Debug, Clone, Default, Args)]
pub struct FetchArgs {
    /// Source id to fetch (default: all sources).
    #[arg(long, short)]
    pub source: Option<String>,

    /// Neither read nor write the cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Skip cache reads and refresh the cache with live results.
    #[arg(long)]
    pub force: bool,

    /// Write `{source_id: [items]}` JSON to this file.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Show only the first N items per source (overrides display.top_n).
    #[arg(long)]
    pub top: Option<usize>,
}

/// Runs the fetch command.
pub async fn run(args: &FetchArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli)?;
    let orchestrator = ctx.orchestrator();
    let use_cache = !args.no_cache;
    let top_n = args.top.or(ctx.settings.display.top_n).filter(|n| *n > 0);

    let start = Instant::now();
    let outcomes: Vec<SourceOutcome> = match args.source {
        Some(ref id) => match orchestrator.fetch_one_outcome(id, use_cache, args.force).await {
            Ok(outcome) => vec![outcome],
            Err(OrchestratorError::UnknownSource(id)) => {
                if !cli.quiet {
                    eprintln!("Unknown source: {id}");
                    eprintln!("Available sources: {}", ctx.registry.ids().join(", "));
                }
                return Ok(ExitCode::UnknownSource);
            }
            Err(e) => return Err(e.into()),
        },
        None => {
            if ctx.registry.is_empty() {
                if !cli.quiet {
                    eprintln!(
                        "No sources configured. Add sources to {}",
                        ctx.config_path.display()
                    );
                }
                return Ok(ExitCode::Success);
            }
            orchestrator.fetch_all(use_cache, args.force).await.outcomes
        }
    };
    let elapsed = start.elapsed();

    let named: Vec<(&str, &SourceOutcome)> = outcomes
        .iter()
        .map(|o| (display_name(&ctx, &o.source_id), o))
        .collect();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            for (name, outcome) in &named {
                println!("{}\n", formatter.format_outcome(name, outcome, top_n));
            }
            let label = if args.source.is_some() { "Elapsed" } else { "Total elapsed" };
            println!("{}", formatter.format_elapsed_line(label, elapsed));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_fetch(&named, top_n, elapsed)?);
        }
    }

    if let Some(ref path) = args.output {
        export(path, &outcomes).await?;
        if !cli.quiet && cli.format == OutputFormat::Text {
            println!("Saved to {}", path.display());
        }
    }

    if outcomes.iter().all(|o| !o.is_success()) {
        return Ok(ExitCode::SourcesFailed);
    }
    Ok(ExitCode::Success)
}

fn display_name<'a>(ctx: &'a AppContext, id: &'a str) -> &'a str {
    ctx.registry.get(id).map_or(id, |s| s.name())
}

/// Writes the full item lists as pretty JSON, creating parent directories.
async fn export(path: &Path, outcomes: &[SourceOutcome]) -> Result<()> {
    let document = export_value(outcomes)?;
    save_json(path, &document)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), sources = outcomes.len(), "Exported items");
    Ok(())
}
