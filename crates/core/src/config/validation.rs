//! Configuration validation rules.
//!
//! This module provides validation logic for `WorkerConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `cache_prefix` or `cache_version` is empty
    /// - a fallback or static asset path does not start with `/`
    /// - both fallback paths are the same
    /// - `hash_header` is not a valid header name
    /// - `retry_after_global` is not a JavaScript identifier
    /// - `stylesheet_extension` does not start with `.`
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `static_assets` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_version.is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        if !self.offline_path.starts_with('/') {
            return Err(invalid("offline_path", "must start with '/'"));
        }
        if !self.rate_limit_path.starts_with('/') {
            return Err(invalid("rate_limit_path", "must start with '/'"));
        }
        if self.offline_path == self.rate_limit_path {
            return Err(invalid("rate_limit_path", "must differ from offline_path"));
        }

        if self.static_assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "static_assets".into(),
                hint: "Set PAGEKEEPER_STATIC_ASSETS or static_assets in the config file".into(),
            });
        }
        if let Some(path) = self.static_assets.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("static_assets", format!("'{path}' must start with '/'")));
        }

        if http::HeaderName::from_bytes(self.hash_header.as_bytes()).is_err() {
            return Err(invalid("hash_header", "not a valid header name"));
        }

        if !is_js_identifier(&self.retry_after_global) {
            return Err(invalid("retry_after_global", "not a valid JavaScript identifier"));
        }

        if !self.stylesheet_extension.starts_with('.') || self.stylesheet_extension.len() < 2 {
            return Err(invalid("stylesheet_extension", "must look like '.css'"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.db_path.is_none() {
            tracing::debug!("no db_path configured; cache generations are kept in memory");
        }

        Ok(())
    }
}
