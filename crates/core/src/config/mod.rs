//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FIGUS_*)
//! 2. TOML config file (if FIGUS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which cache storage backend the worker runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FIGUS_*)
/// 2. TOML config file (if FIGUS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// The application's own origin. Requests to any other origin are not intercepted.
    ///
    /// Set via FIGUS_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Application part of the cache generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployed version number; bumping it supersedes the previous generation.
    ///
    /// Set via FIGUS_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// Same-origin paths stored at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Page served when a navigation cannot reach the network.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// Path suffixes that mark a request as a static asset.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Path prefixes that mark a request as a static asset.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// Reserved API prefix; these requests always go to the network.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Cache storage backend.
    ///
    /// Set via FIGUS_STORAGE environment variable (`sqlite` or `memory`).
    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    /// Path to SQLite cache database.
    ///
    /// Set via FIGUS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via FIGUS_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_prefix() -> String {
    "misfigus".into()
}

fn default_cache_version() -> u32 {
    1
}

fn default_precache() -> Vec<String> {
    vec!["/".into(), "/offline.html".into(), "/manifest.json".into()]
}

fn default_offline_fallback() -> String {
    "/offline.html".into()
}

fn default_static_extensions() -> Vec<String> {
    [".js", ".css", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".woff", ".woff2", ".ttf", ".eot", ".json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/static/".into(), "/assets/".into()]
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_storage() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./figus-cache.sqlite")
}

fn default_user_agent() -> String {
    "figus-worker/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            offline_fallback: default_offline_fallback(),
            static_extensions: default_static_extensions(),
            static_prefixes: default_static_prefixes(),
            api_prefix: default_api_prefix(),
            storage: default_storage(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the current cache generation, e.g. `misfigus-v1`.
    pub fn cache_name(&self) -> String {
        format!("{}-v{}", self.cache_prefix, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FIGUS_`
    /// 2. TOML file from `FIGUS_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("FIGUS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FIGUS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:5173");
        assert_eq!(config.cache_name(), "misfigus-v1");
        assert_eq!(config.precache, vec!["/", "/offline.html", "/manifest.json"]);
        assert_eq!(config.offline_fallback, "/offline.html");
        assert_eq!(config.api_prefix, "/api/");
        assert_eq!(config.static_prefixes, vec!["/static/", "/assets/"]);
        assert!(config.static_extensions.iter().any(|e| e == ".woff2"));
        assert_eq!(config.storage, StorageBackend::Sqlite);
        assert_eq!(config.db_path, PathBuf::from("./figus-cache.sqlite"));
        assert_eq!(config.timeout_ms, 20_000);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_cache_name_tracks_version() {
        let config = AppConfig { cache_version: 7, ..Default::default() };
        assert_eq!(config.cache_name(), "misfigus-v7");
    }

    #[test]
    fn test_load_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FIGUS_CACHE_VERSION", "2");
            jail.set_env("FIGUS_STORAGE", "memory");
            jail.set_env("FIGUS_STATIC_PREFIXES", r#"["/media/"]"#);

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_name(), "misfigus-v2");
            assert_eq!(config.storage, StorageBackend::Memory);
            assert_eq!(config.static_prefixes, vec!["/media/"]);
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file_below_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "figus.toml",
                r#"
                origin = "https://misfigus.app"
                cache_version = 3
                "#,
            )?;
            jail.set_env("FIGUS_CONFIG_FILE", "figus.toml");
            jail.set_env("FIGUS_CACHE_VERSION", "4");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.origin, "https://misfigus.app");
            assert_eq!(config.cache_version, 4);
            Ok(())
        });
    }
}
