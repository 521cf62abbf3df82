//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PAGEKEEPER_*)
//! 2. TOML config file (if PAGEKEEPER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Cache controller configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PAGEKEEPER_*)
/// 2. TOML config file (if PAGEKEEPER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Origin the controlled site is served from. Relative paths resolve against it.
    ///
    /// Set via PAGEKEEPER_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix of every cache generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token of the current generation, rewritten on each deploy.
    ///
    /// Set via PAGEKEEPER_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path of the offline fallback document.
    #[serde(default = "default_offline_path")]
    pub offline_path: String,

    /// Path of the rate-limit fallback document.
    #[serde(default = "default_rate_limit_path")]
    pub rate_limit_path: String,

    /// Fixed asset paths precached on install and refreshed on use.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Extension marking a path as a stylesheet.
    #[serde(default = "default_stylesheet_extension")]
    pub stylesheet_extension: String,

    /// Synthetic header carrying the content hash of cached asset bodies.
    #[serde(default = "default_hash_header")]
    pub hash_header: String,

    /// Global variable the rate-limit page reads its retry countdown from.
    #[serde(default = "default_retry_after_global")]
    pub retry_after_global: String,

    /// Path of the SQLite cache database. Unset keeps caches in memory.
    ///
    /// Set via PAGEKEEPER_DB_PATH environment variable.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "site-cache".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_offline_path() -> String {
    "/offline/".into()
}

fn default_rate_limit_path() -> String {
    "/429/".into()
}

fn default_static_assets() -> Vec<String> {
    vec!["/favicon.ico".into(), "/images/avatar.webp".into(), "/images/og-default.png".into()]
}

fn default_stylesheet_extension() -> String {
    ".css".into()
}

fn default_hash_header() -> String {
    "x-sw-content-hash".into()
}

fn default_retry_after_global() -> String {
    "__RETRY_AFTER__".into()
}

fn default_user_agent() -> String {
    "pagekeeper/0.1".into()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            offline_path: default_offline_path(),
            rate_limit_path: default_rate_limit_path(),
            static_assets: default_static_assets(),
            stylesheet_extension: default_stylesheet_extension(),
            hash_header: default_hash_header(),
            retry_after_global: default_retry_after_global(),
            db_path: None,
            user_agent: default_user_agent(),
        }
    }
}

impl WorkerConfig {
    /// Name of the current cache generation.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// The two fallback documents, offline first.
    pub fn fallback_paths(&self) -> [&str; 2] {
        [self.offline_path.as_str(), self.rate_limit_path.as_str()]
    }

    /// Everything precached on install: static assets, then fallbacks.
    pub fn precache_paths(&self) -> Vec<&str> {
        self.static_assets
            .iter()
            .map(String::as_str)
            .chain(self.fallback_paths())
            .collect()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PAGEKEEPER_`
    /// 2. TOML file from `PAGEKEEPER_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment can't be parsed, or
    /// if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PAGEKEEPER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PAGEKEEPER_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
