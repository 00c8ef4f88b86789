//! List command - show registered sources.

use anyhow::Result;
use tracing::info;

use crate::commands::AppContext;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the list command.
pub fn run(cli: &Cli) -> Result<ExitCode> {
    info!("Listing sources");
    let ctx = AppContext::load(cli)?;
    let sources = ctx.registry.all();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_source_list(sources));
            if sources.is_empty() && !cli.quiet {
                println!("Add sources to {}", ctx.config_path.display());
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_sources(sources)?);
        }
    }

    Ok(ExitCode::Success)
}
