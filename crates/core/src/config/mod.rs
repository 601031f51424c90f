//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SCOUT_*)
//! 2. TOML config file (if SCOUT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::model::Backend;

mod validation;

pub use validation::ConfigError;

/// Storage used behind the content cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SCOUT_*)
/// 2. TOML config file (if SCOUT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix of every cache key (`{namespace}:{section}:{hash}`).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Storage behind the content cache.
    #[serde(default)]
    pub cache_backend: CacheBackendKind,

    /// Path to SQLite cache database, used when `cache_backend = "sqlite"`.
    ///
    /// Set via SCOUT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Maximum number of cache entries before LRU eviction.
    #[serde(default = "default_cache_max_size")]
    pub cache_max_size: usize,

    /// Lifetime of an escalation record.
    #[serde(default = "default_escalation_ttl_secs")]
    pub escalation_ttl_secs: u64,

    /// Lifetime of a cached query result set.
    #[serde(default = "default_query_ttl_secs")]
    pub query_ttl_secs: u64,

    /// Maximum age at which an escalation record still counts as fresh.
    #[serde(default = "default_escalation_max_age_secs")]
    pub escalation_max_age_secs: u64,

    /// Interval of the background expiry sweep; 0 disables it.
    #[serde(default)]
    pub sweep_interval_secs: u64,

    /// Timeout of the routing classifier call in milliseconds.
    #[serde(default = "default_router_timeout_ms")]
    pub router_timeout_ms: u64,

    /// Timeout of the per-item escalation classifier call in milliseconds.
    #[serde(default = "default_classifier_timeout_ms")]
    pub classifier_timeout_ms: u64,

    /// Timeout of a deep fetch in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Timeout of a live backend query in milliseconds.
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,

    /// Winner order for dedup collisions, highest priority first.
    #[serde(default = "default_backend_priority")]
    pub backend_priority: Vec<Backend>,

    /// Attempts made by the retry wrapper around the fetch capability.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Base delay of the retry wrapper in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Maximum number of ranked items in a bundle.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Endpoint of the HTTP classifier adapter.
    ///
    /// Set via SCOUT_CLASSIFIER_URL environment variable.
    #[serde(default)]
    pub classifier_url: Option<String>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes read per deep fetch.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_namespace() -> String {
    "scout".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./scout-cache.sqlite")
}

fn default_cache_max_size() -> usize {
    10_000
}

fn default_escalation_ttl_secs() -> u64 {
    86_400
}

fn default_query_ttl_secs() -> u64 {
    900
}

fn default_escalation_max_age_secs() -> u64 {
    86_400
}

fn default_router_timeout_ms() -> u64 {
    5_000
}

fn default_classifier_timeout_ms() -> u64 {
    5_000
}

fn default_fetch_timeout_ms() -> u64 {
    20_000
}

fn default_source_timeout_ms() -> u64 {
    10_000
}

fn default_backend_priority() -> Vec<Backend> {
    vec![Backend::StructuredApi, Backend::EscalatedFetch, Backend::ShallowFetch, Backend::Cache]
}

fn default_retry_max_attempts() -> u32 {
    1
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_max_results() -> usize {
    50
}

fn default_user_agent() -> String {
    "scout/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            cache_backend: CacheBackendKind::default(),
            db_path: default_db_path(),
            cache_max_size: default_cache_max_size(),
            escalation_ttl_secs: default_escalation_ttl_secs(),
            query_ttl_secs: default_query_ttl_secs(),
            escalation_max_age_secs: default_escalation_max_age_secs(),
            sweep_interval_secs: 0,
            router_timeout_ms: default_router_timeout_ms(),
            classifier_timeout_ms: default_classifier_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            source_timeout_ms: default_source_timeout_ms(),
            backend_priority: default_backend_priority(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_results: default_max_results(),
            classifier_url: None,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    pub fn escalation_ttl(&self) -> Duration {
        Duration::from_secs(self.escalation_ttl_secs)
    }

    pub fn query_ttl(&self) -> Duration {
        Duration::from_secs(self.query_ttl_secs)
    }

    pub fn escalation_max_age(&self) -> Duration {
        Duration::from_secs(self.escalation_max_age_secs)
    }

    /// Sweep interval, or `None` when the sweep is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn router_timeout(&self) -> Duration {
        Duration::from_millis(self.router_timeout_ms)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SCOUT_`
    /// 2. TOML file from `SCOUT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SCOUT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SCOUT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::extract(figment)
    }

    /// Extract and validate a configuration from an explicit figment.
    pub fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Classifier endpoint for the HTTP adapter.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the classifier URL is not set.
    pub fn require_classifier_url(&self) -> Result<&str, ConfigError> {
        self.classifier_url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "classifier_url".into(),
            hint: "Set SCOUT_CLASSIFIER_URL environment variable".into(),
        })
    }
}
