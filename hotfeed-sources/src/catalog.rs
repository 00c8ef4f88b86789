//! Builds the registry and orchestrator described by [`Settings`].

use hotfeed_fetch::HttpClient;
use hotfeed_store::{Settings, SourceConfig, TieredCache};
use std::sync::Arc;
use tracing::info;

use crate::error::OrchestratorError;
use crate::json_api::JsonApiSource;
use crate::orchestrator::FetchOrchestrator;
use crate::registry::{Source, SourceRegistry};

/// Registers every configured source, in file order.
///
/// All sources share one HTTP client whose timeout is `fetch.timeout_secs`
/// and which only contacts `fetch.allowed_domains` when that list is set.
///
/// # Errors
///
/// Returns [`OrchestratorError::InvalidSource`] for the first source that
/// cannot be built.
pub fn build_registry(settings: &Settings) -> Result<SourceRegistry, OrchestratorError> {
    let http = HttpClient::with_timeout(settings.fetch.timeout()).map_err(|e| {
        OrchestratorError::InvalidSource {
            id: "*".to_string(),
            reason: e.to_string(),
        }
    })?;
    let http = if settings.fetch.allowed_domains.is_empty() {
        http
    } else {
        http.with_allowed_domains(settings.fetch.allowed_domains.clone())
    };

    let mut registry = SourceRegistry::new();
    for config in &settings.sources {
        registry
            .register_source(json_source(config, &http)?)
            .map_err(|e| invalid(config, e))?;
    }

    info!(sources = registry.len(), "Source registry ready");
    Ok(registry)
}

fn json_source(config: &SourceConfig, http: &HttpClient) -> Result<Source, OrchestratorError> {
    let fetcher = JsonApiSource::new(config.clone(), http.clone()).map_err(|e| invalid(config, e))?;
    Ok(Source::new(config.info(), Arc::new(fetcher)))
}

fn invalid(config: &SourceConfig, reason: impl std::fmt::Display) -> OrchestratorError {
    OrchestratorError::InvalidSource {
        id: config.id.clone(),
        reason: reason.to_string(),
    }
}

/// Creates an orchestrator over `registry` using the cache and fetch settings.
pub fn build_orchestrator(
    settings: &Settings,
    cache: Arc<TieredCache>,
    registry: Arc<SourceRegistry>,
) -> FetchOrchestrator {
    FetchOrchestrator::new(cache, registry)
        .with_timeout(settings.fetch.timeout())
        .with_concurrency(settings.fetch.concurrency)
}
