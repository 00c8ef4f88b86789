//! Check command - live health check of every source.
//!
//! Sources are fetched one at a time with the cache bypassed, so each row
//! reflects the source's current behavior and latency.

use anyhow::Result;
use hotfeed_sources::SourceOutcome;
use std::time::Instant;
use tracing::info;

use crate::commands::AppContext;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the check command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli)?;
    let orchestrator = ctx.orchestrator();
    let formatter = TextFormatter::new(!cli.no_color);
    let text = cli.format == OutputFormat::Text;

    if ctx.registry.is_empty() {
        if !cli.quiet {
            eprintln!("No sources configured. Add sources to {}", ctx.config_path.display());
        }
        return Ok(ExitCode::Success);
    }

    info!(sources = ctx.registry.len(), "Checking sources");
    let start = Instant::now();
    let mut outcomes: Vec<SourceOutcome> = Vec::with_capacity(ctx.registry.len());
    for source in ctx.registry.all() {
        let outcome = orchestrator.fetch_one_outcome(source.id(), false, true).await?;
        if text {
            println!("{}", formatter.format_check_line(source.name(), &outcome));
        }
        outcomes.push(outcome);
    }
    let elapsed = start.elapsed();

    if text {
        println!();
        println!("{}", formatter.format_check_summary(&outcomes, elapsed));
    } else {
        let named: Vec<(&str, &SourceOutcome)> = ctx
            .registry
            .all()
            .iter()
            .map(|s| s.name())
            .zip(outcomes.iter())
            .collect();
        println!("{}", JsonFormatter::new(cli.pretty).format_check(&named, elapsed)?);
    }

    if outcomes.iter().any(|o| !o.is_success()) {
        return Ok(ExitCode::SourcesFailed);
    }
    Ok(ExitCode::Success)
}
