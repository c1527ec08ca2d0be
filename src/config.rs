//! Configuration for the shopping assistant.
//!
//! Loaded from a TOML file (see `regional-shopping init`), then adjusted by
//! environment variables and CLI flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};

/// Upper bound accepted for `search.max_limit`.
pub const MAX_RESULT_LIMIT: usize = 100;

/// Longest accepted result cache TTL (one day).
pub const MAX_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP API settings.
    pub api: ApiConfig,
    /// Search provider settings.
    pub search: SearchConfig,
    /// Local catalog settings.
    pub catalog: CatalogConfig,
    /// Metrics settings.
    pub metrics: MetricsConfig,
}

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to bind the API server to.
    pub listen_address: String,
    /// Enable CORS.
    pub cors_enabled: bool,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:5000".to_string(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Search provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Use the Tavily search API.
    pub enable_tavily: bool,
    /// Tavily API key. Required for the Tavily provider to become active.
    pub tavily_api_key: Option<String>,
    /// Use the DuckDuckGo API.
    pub enable_duckduckgo: bool,
    /// Load the sentence-embedding model for catalog search.
    pub enable_semantic: bool,
    /// Timeout for outbound provider requests.
    pub request_timeout_secs: u64,
    /// Limit used when a request does not specify one.
    pub default_limit: usize,
    /// Largest limit a request may ask for.
    pub max_limit: usize,
    /// How long remote results stay cached.
    pub cache_ttl_secs: u64,
    /// Maximum number of cached result sets.
    pub cache_capacity: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enable_tavily: true,
            tavily_api_key: None,
            enable_duckduckgo: true,
            enable_semantic: false,
            request_timeout_secs: 30,
            default_limit: 10,
            max_limit: 50,
            cache_ttl_secs: 300,
            cache_capacity: 1000,
        }
    }
}

impl SearchConfig {
    /// Outbound request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Cache TTL as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Local product catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Optional JSON file with extra catalog products.
    pub path: Option<PathBuf>,
    /// Include the built-in regional catalog.
    pub include_builtin: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            include_builtin: true,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("TAVILY_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.search.tavily_api_key = Some(key);
        }
        if let Some(flag) = lookup("ENABLE_TAVILY_SEARCH").and_then(|v| parse_flag(&v)) {
            self.search.enable_tavily = flag;
        }
        if let Some(flag) = lookup("ENABLE_DUCKDUCKGO_SEARCH").and_then(|v| parse_flag(&v)) {
            self.search.enable_duckduckgo = flag;
        }
        if let Some(flag) = lookup("ENABLE_RAG_SERVICE").and_then(|v| parse_flag(&v)) {
            self.search.enable_semantic = flag;
        }
        if let Some(raw) = lookup("AGENT_TIMEOUT") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.search.request_timeout_secs = secs,
                _ => warn!("Ignoring invalid AGENT_TIMEOUT value: {}", raw),
            }
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        if search.request_timeout_secs == 0 {
            return Err(Error::Config(
                "search.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if search.max_limit == 0 || search.max_limit > MAX_RESULT_LIMIT {
            return Err(Error::Config(format!(
                "search.max_limit must be between 1 and {}",
                MAX_RESULT_LIMIT
            )));
        }
        if search.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(Error::Config(format!(
                "search.cache_ttl_secs must be at most {}",
                MAX_CACHE_TTL_SECS
            )));
        }
        if search.default_limit == 0 || search.default_limit > search.max_limit {
            return Err(Error::Config(
                "search.default_limit must be between 1 and search.max_limit".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
