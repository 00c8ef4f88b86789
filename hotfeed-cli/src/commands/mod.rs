//! CLI command implementations.

pub mod cache;
pub mod check;
pub mod fetch;
pub mod generate;
pub mod list;

use anyhow::{Context, Result};
use hotfeed_sources::{FetchOrchestrator, SourceRegistry, catalog};
use hotfeed_store::{Settings, TieredCache, default_config_path};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::Cli;

/// Settings plus the shared cache and registry, built once per run.
pub struct AppContext {
    /// Loaded settings.
    pub settings: Settings,
    /// Path the settings were read from.
    pub config_path: PathBuf,
    /// Shared cache.
    pub cache: Arc<TieredCache>,
    /// Shared registry.
    pub registry: Arc<SourceRegistry>,
}

impl AppContext {
    /// Loads settings and builds the cache and registry.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli.config.clone().unwrap_or_else(default_config_path);
        let settings = Settings::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        debug!(path = %config_path.display(), "Settings loaded");

        let registry = catalog::build_registry(&settings).context("building source registry")?;
        let cache = TieredCache::from_settings(&settings.cache);

        Ok(Self {
            settings,
            config_path,
            cache: Arc::new(cache),
            registry: Arc::new(registry),
        })
    }

    /// Creates an orchestrator over the shared cache and registry.
    pub fn orchestrator(&self) -> FetchOrchestrator {
        catalog::build_orchestrator(
            &self.settings,
            Arc::clone(&self.cache),
            Arc::clone(&self.registry),
        )
    }
}
