//! Application configuration.
//!
//! Loaded from `<config_dir>/hotfeed/config.yaml` (or an explicit path),
//! then adjusted by `HOTFEED_*` environment variables. Every field has a
//! default, so a partial file or no file at all is valid.

use hotfeed_core::SourceInfo;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_cache_dir, default_config_path};

/// Display limit override.
pub const ENV_TOP_N: &str = "HOTFEED_TOP_N";
/// Cache directory override.
pub const ENV_CACHE_DIR: &str = "HOTFEED_CACHE_DIR";
/// Cache TTL override, in seconds.
pub const ENV_CACHE_TTL: &str = "HOTFEED_CACHE_TTL";

// ============================================================================
// Settings Types
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cache tiers.
    pub cache: CacheSettings,
    /// Fetch scheduling.
    pub fetch: FetchSettings,
    /// Presentation.
    pub display: DisplaySettings,
    /// Configured JSON API sources, in registration order.
    pub sources: Vec<SourceConfig>,
    /// Generation provider chain.
    pub generation: GenerationSettings,
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
    /// Durable tier directory.
    pub dir: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 1800,
            dir: default_cache_dir(),
        }
    }
}

impl CacheSettings {
    /// Returns the TTL.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Fetch scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Upper bound on a single source fetch, in seconds.
    pub timeout_secs: u64,
    /// Maximum sources fetched at once. `1` fetches sequentially.
    pub concurrency: usize,
    /// Hosts sources may contact (subdomains included). Empty allows any.
    pub allowed_domains: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            concurrency: 1,
            allowed_domains: Vec::new(),
        }
    }
}

impl FetchSettings {
    /// Returns the per-fetch timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Presentation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Items shown per source. `None` shows all.
    pub top_n: Option<usize>,
}

/// A source backed by a JSON HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Endpoint returning JSON.
    pub url: String,
    /// Dotted path to the item array (`data.realtime`). Empty means the root.
    #[serde(default)]
    pub items_path: String,
    /// Field holding the title.
    #[serde(default = "default_title_field")]
    pub title_field: String,
    /// Field holding the link.
    #[serde(default = "default_url_field")]
    pub url_field: String,
    /// Link template with `{field}` placeholders, used instead of `url_field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_template: Option<String>,
    /// Field copied into the item's `info` extra.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_field: Option<String>,
    /// Further fields copied verbatim into the item's extras.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_fields: Vec<String>,
    /// Request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Human-facing home page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_url: Option<String>,
}

fn default_title_field() -> String {
    "title".to_string()
}

fn default_url_field() -> String {
    "url".to_string()
}

impl SourceConfig {
    /// Creates a config with default field names.
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            items_path: String::new(),
            title_field: default_title_field(),
            url_field: default_url_field(),
            url_template: None,
            info_field: None,
            extra_fields: Vec::new(),
            headers: BTreeMap::new(),
            home_url: None,
        }
    }

    /// Returns the source metadata.
    pub fn info(&self) -> SourceInfo {
        let info = SourceInfo::new(&self.id, &self.name);
        match self.home_url {
            Some(ref home) => info.with_home_url(home),
            None => info,
        }
    }
}

/// Generation provider chain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Provider tried first.
    pub primary: Option<ProviderConfig>,
    /// Provider used after the primary fails.
    pub secondary: Option<ProviderConfig>,
    /// Retries after the first attempt on connection errors.
    pub max_retries: u32,
    /// Base of the `base^n` seconds backoff.
    pub backoff_base: f64,
    /// Upper bound on a single provider call, in seconds.
    pub timeout_secs: u64,
    /// Stream responses by default.
    pub stream: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            primary: None,
            secondary: None,
            max_retries: 3,
            backoff_base: 2.0,
            timeout_secs: 60,
            stream: false,
        }
    }
}

impl GenerationSettings {
    /// Returns the per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// An OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name used in logs and reports.
    pub name: String,
    /// API base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Literal API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token limit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1500
}

impl ProviderConfig {
    /// Resolves the API key from the process environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolves the API key: the named variable first, then the literal.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key_env
            .as_deref()
            .and_then(lookup)
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Settings {
    /// Loads settings from the default path, then applies the environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn load_default() -> Result<Self, StoreError> {
        Self::load(&default_config_path())
    }

    /// Loads settings from `path`, then applies the environment.
    ///
    /// A missing or empty file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, does not
    /// parse, or fails [`Settings::validate`].
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let mut settings = Self::load_file(path)?;
        settings.apply_overrides(|name| std::env::var(name).ok());
        settings.validate()?;
        Ok(settings)
    }

    fn load_file(path: &Path) -> Result<Self, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let settings = Self::from_yaml(&content)?;
        info!(path = %path.display(), sources = settings.sources.len(), "Loaded configuration");
        Ok(settings)
    }

    /// Parses settings from YAML text. Blank text yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Yaml`] for malformed documents.
    pub fn from_yaml(content: &str) -> Result<Self, StoreError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies `HOTFEED_*` overrides read through `lookup`.
    ///
    /// Unparseable values are ignored with a warning, as is a zero
    /// `HOTFEED_TOP_N`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TOP_N) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.display.top_n = Some(n),
                _ => warn!(value = %raw, "Ignoring {ENV_TOP_N}: expected a positive integer"),
            }
        }

        if let Some(raw) = lookup(ENV_CACHE_DIR) {
            if raw.trim().is_empty() {
                warn!("Ignoring empty {ENV_CACHE_DIR}");
            } else {
                self.cache.dir = PathBuf::from(raw);
            }
        }

        if let Some(raw) = lookup(ENV_CACHE_TTL) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.cache.ttl_secs = secs,
                Err(_) => warn!(value = %raw, "Ignoring {ENV_CACHE_TTL}: expected seconds"),
            }
        }
    }

    /// Checks source ids and scheduling limits.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for invalid source ids, empty source
    /// URLs, or a zero concurrency.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.fetch.concurrency == 0 {
            return Err(StoreError::Config("fetch.concurrency must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            SourceInfo::validate_id(&source.id).map_err(|e| StoreError::Config(e.to_string()))?;
            if source.url.trim().is_empty() {
                return Err(StoreError::Config(format!("source {} has no url", source.id)));
            }
            if !seen.insert(source.id.as_str()) {
                warn!(id = %source.id, "Duplicate source id, the later entry replaces the earlier");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.cache.ttl_secs, 1800);
        assert_eq!(settings.fetch.timeout_secs, 30);
        assert_eq!(settings.fetch.concurrency, 1);
        assert_eq!(settings.display.top_n, None);
        assert_eq!(settings.generation.max_retries, 3);
        assert!((settings.generation.backoff_base - 2.0).abs() < f64::EPSILON);
        assert!(settings.sources.is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml(
            r"
cache:
  ttl_secs: 60
sources:
  - id: weibo
    name: Weibo Hot Search
    url: https://weibo.com/ajax/side/hotSearch
    items_path: data.realtime
    title_field: word
    url_template: https://s.weibo.com/weibo?q={word}
    info_field: num
",
        )
        .unwrap();

        assert_eq!(settings.cache.ttl_secs, 60);
        assert_eq!(settings.fetch.concurrency, 1);
        let weibo = &settings.sources[0];
        assert_eq!(weibo.items_path, "data.realtime");
        assert_eq!(weibo.url_field, "url");
        assert_eq!(weibo.info_field.as_deref(), Some("num"));
        assert_eq!(weibo.info().id, "weibo");
    }

    #[test]
    fn test_blank_yaml_is_default() {
        assert_eq!(Settings::from_yaml("  \n").unwrap().cache.ttl_secs, 1800);
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(matches!(
            Settings::from_yaml("cache: [unterminated"),
            Err(StoreError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::load_file(&tmp.path().join("absent.yaml")).unwrap();
        assert!(settings.sources.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides(env(&[
            (ENV_TOP_N, "10"),
            (ENV_CACHE_DIR, "/var/tmp/hf"),
            (ENV_CACHE_TTL, "90"),
        ]));
        assert_eq!(settings.display.top_n, Some(10));
        assert_eq!(settings.cache.dir, PathBuf::from("/var/tmp/hf"));
        assert_eq!(settings.cache.ttl(), Duration::from_secs(90));
    }

    #[test]
    fn test_invalid_top_n_ignored() {
        for raw in ["abc", "0", "-3", ""] {
            let mut settings = Settings::default();
            settings.display.top_n = Some(5);
            settings.apply_overrides(env(&[(ENV_TOP_N, raw)]));
            assert_eq!(settings.display.top_n, Some(5), "value {raw:?}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_source_id() {
        let mut settings = Settings::default();
        settings.sources.push(SourceConfig::new("bad id", "Bad", "https://x.test"));
        assert!(matches!(settings.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut settings = Settings::default();
        settings.fetch.concurrency = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_api_key_resolution_order() {
        let provider = ProviderConfig {
            name: "qwen".to_string(),
            base_url: "https://dashscope.example.com/v1".to_string(),
            model: "qwen-plus".to_string(),
            api_key: Some("literal".to_string()),
            api_key_env: Some("QWEN_KEY".to_string()),
            temperature: 0.7,
            max_tokens: 1500,
        };
        assert_eq!(
            provider.resolve_api_key_with(env(&[("QWEN_KEY", "from-env")])).as_deref(),
            Some("from-env")
        );
        assert_eq!(provider.resolve_api_key_with(env(&[])).as_deref(), Some("literal"));
        assert_eq!(
            provider.resolve_api_key_with(env(&[("QWEN_KEY", " ")])).as_deref(),
            Some("literal")
        );
    }
}
