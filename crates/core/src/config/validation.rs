//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL with a host
    /// - `cache_prefix` or `user_agent` is empty
    /// - any configured path does not start with `/`
    /// - `offline_fallback` is not part of `precache`
    /// - a static extension does not start with `.`
    /// - `timeout_ms` is outside 100ms..=5min or `max_bytes` outside 1..=50MB
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none() {
            return Err(invalid("origin", "must be an http(s) URL with a host"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }

        if self.precache.is_empty() {
            return Err(ConfigError::Missing {
                field: "precache".into(),
                hint: "list at least the offline fallback page".into(),
            });
        }
        if let Some(path) = self.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("precache", format!("path {path:?} must start with '/'")));
        }

        if !self.offline_fallback.starts_with('/') {
            return Err(invalid("offline_fallback", "must start with '/'"));
        }
        if !self.precache.contains(&self.offline_fallback) {
            return Err(invalid("offline_fallback", "must be listed in precache"));
        }

        if let Some(ext) = self.static_extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
            return Err(invalid("static_extensions", format!("extension {ext:?} must look like '.js'")));
        }
        if let Some(prefix) = self.static_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("static_prefixes", format!("prefix {prefix:?} must start with '/'")));
        }
        if !self.api_prefix.starts_with('/') {
            return Err(invalid("api_prefix", "must start with '/'"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.static_prefixes.iter().any(|p| p.starts_with(&self.api_prefix)) {
            tracing::warn!(
                api_prefix = %self.api_prefix,
                "a static prefix lies under the API prefix; API routing takes precedence"
            );
        }

        Ok(())
    }
}
