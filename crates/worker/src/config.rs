//! Router configuration.
//!
//! Everything the router needs to know about the application is carried in
//! one [`RouterConfig`] value handed to [`crate::RequestRouter::new`].

use figus_client::{resolve, same_origin};
use figus_core::{AppConfig, Error};
use url::Url;

/// Routing and caching parameters for one deployed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// The application's own origin.
    pub origin: Url,
    /// Name of the current cache generation.
    pub cache_name: String,
    /// Same-origin paths stored at install time, in order.
    pub precache: Vec<String>,
    /// Precached page served for failed navigations.
    pub offline_fallback: String,
    pub static_extensions: Vec<String>,
    pub static_prefixes: Vec<String>,
    pub api_prefix: String,
}

impl RouterConfig {
    /// Build the router configuration from loaded application settings.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self {
            origin,
            cache_name: config.cache_name(),
            precache: config.precache.clone(),
            offline_fallback: config.offline_fallback.clone(),
            static_extensions: config.static_extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            static_prefixes: config.static_prefixes.clone(),
            api_prefix: config.api_prefix.clone(),
        })
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        same_origin(&self.origin, url)
    }

    pub fn is_api_path(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
    }

    /// Static assets are recognised by file extension or by directory.
    ///
    /// `path` must not include the query string.
    pub fn is_static_path(&self, path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        self.static_extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
            || self.static_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Absolute URLs of the precache set, in configured order.
    pub fn precache_urls(&self) -> Result<Vec<Url>, Error> {
        self.precache.iter().map(|path| self.resolve(path)).collect()
    }

    /// Cache key of the offline fallback page.
    pub fn offline_fallback_url(&self) -> Result<Url, Error> {
        self.resolve(&self.offline_fallback)
    }

    fn resolve(&self, path: &str) -> Result<Url, Error> {
        resolve(&self.origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }
}
