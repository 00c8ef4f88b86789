//! Generate command - run a prompt through the provider chain.

use anyhow::{Context, Result, bail};
use clap::Args;
use hotfeed_fetch::{
    CallMode, FailoverClient, GenerationProvider, OpenAiCompatibleProvider, OpenAiConfig,
    ProviderChain, RetryStrategy,
};
use hotfeed_store::{GenerationSettings, ProviderConfig};
use std::sync::Arc;
use tracing::{info, warn};

use crate::commands::AppContext;
use crate::output::{JsonFormatter, TextFormatter, format_elapsed};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the generate command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Prompt text.
    pub prompt: String,

    /// Stream the response and accumulate chunks before deciding success.
    #[arg(long)]
    pub stream: bool,
}

/// Runs the generate command.
pub async fn run(args: &GenerateArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli)?;
    let generation = &ctx.settings.generation;
    let client = build_client(generation)?;

    let mode = if args.stream || generation.stream {
        CallMode::Streaming
    } else {
        CallMode::Blocking
    };
    info!(?mode, primary = client.chain().primary().name(), "Generating");

    let outcome = client.execute(&args.prompt, mode).await;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_generation(&outcome)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            match outcome.result {
                Ok(ref text) => println!("{text}"),
                Err(ref e) if !cli.quiet => eprintln!("Generation failed: {e}"),
                Err(_) => {}
            }
            if cli.verbose || outcome.failed_over() {
                eprintln!("{}", formatter.format_attempts(&outcome));
                eprintln!("Elapsed: {}", format_elapsed(outcome.duration));
            }
        }
    }

    if outcome.is_success() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::GenerationFailed)
    }
}

/// Builds the failover client from the generation settings.
fn build_client(settings: &GenerationSettings) -> Result<FailoverClient> {
    let Some(ref primary) = settings.primary else {
        bail!("no generation.primary provider configured");
    };

    let mut chain = ProviderChain::new(build_provider(primary, settings)?)
        .with_retry(RetryStrategy::new(settings.max_retries, settings.backoff_base));
    if let Some(ref secondary) = settings.secondary {
        chain = chain.with_secondary(build_provider(secondary, settings)?);
    }

    Ok(FailoverClient::new(chain).with_timeout(settings.timeout()))
}

fn build_provider(
    config: &ProviderConfig,
    settings: &GenerationSettings,
) -> Result<Arc<dyn GenerationProvider>> {
    let mut openai = OpenAiConfig::new(&config.name, &config.base_url, &config.model);
    openai.temperature = config.temperature;
    openai.max_tokens = config.max_tokens;
    openai.timeout = settings.timeout();
    match config.resolve_api_key() {
        Some(key) => openai = openai.with_api_key(key),
        None => warn!(provider = %config.name, "No API key configured"),
    }

    let provider = OpenAiCompatibleProvider::new(openai)
        .with_context(|| format!("building provider {}", config.name))?;
    Ok(Arc::new(provider))
}
