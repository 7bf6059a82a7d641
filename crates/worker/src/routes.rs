//! Ordered route table.
//!
//! Each intercepted request is matched against the routes top to bottom and
//! handled with the strategy of the first route whose predicate holds. The
//! standard table is:
//!
//! | # | route        | strategy                     |
//! |---|--------------|------------------------------|
//! | 1 | cross-origin | passthrough (not intercepted)|
//! | 2 | api          | network only                 |
//! | 3 | navigation   | network, offline page        |
//! | 4 | non-get      | passthrough (not intercepted)|
//! | 5 | static       | cache first, refresh         |
//! | 6 | fallback     | network, cached copy         |
//!
//! Only `GET` requests ever reach a route that reads or writes the cache.

use crate::config::RouterConfig;
use figus_core::Request;
use std::fmt;

/// How a classified request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Leave the request to default network handling.
    Passthrough,
    /// Always the network; a synthetic 503 JSON body when it fails.
    NetworkOnly,
    /// Network first; the precached offline page when it fails.
    NavigationFallback,
    /// Cached copy first with a background refresh; network on a miss.
    CacheFirst,
    /// Network first; the cached copy of the same URL when it fails.
    NetworkFirst,
}

type Predicate = Box<dyn Fn(&Request, &RouterConfig) -> bool + Send + Sync>;

/// One `{ predicate, strategy }` pair.
pub struct Route {
    pub name: &'static str,
    pub strategy: Strategy,
    predicate: Predicate,
}

impl Route {
    pub fn matches(&self, request: &Request, config: &RouterConfig) -> bool {
        (self.predicate)(request, config)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// Routes evaluated in insertion order.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// An empty table. Requests matching no route are passed through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route below the existing ones.
    pub fn route<F>(mut self, name: &'static str, strategy: Strategy, predicate: F) -> Self
    where
        F: Fn(&Request, &RouterConfig) -> bool + Send + Sync + 'static,
    {
        self.routes.push(Route { name, strategy, predicate: Box::new(predicate) });
        self
    }

    /// The application's routing policy.
    pub fn standard() -> Self {
        Self::new()
            .route("cross-origin", Strategy::Passthrough, |req, cfg| !cfg.is_same_origin(&req.url))
            .route("api", Strategy::NetworkOnly, |req, cfg| cfg.is_api_path(req.path()))
            .route("navigation", Strategy::NavigationFallback, |req, _| req.is_navigation())
            .route("non-get", Strategy::Passthrough, |req, _| !req.is_cacheable())
            .route("static", Strategy::CacheFirst, |req, cfg| cfg.is_static_path(req.path()))
            .route("fallback", Strategy::NetworkFirst, |_, _| true)
    }

    /// First route matching `request`.
    pub fn classify(&self, request: &Request, config: &RouterConfig) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(request, config))
    }

    /// Strategy for `request`, passthrough when nothing matches.
    pub fn strategy_for(&self, request: &Request, config: &RouterConfig) -> Strategy {
        self.classify(request, config)
            .map(|route| route.strategy)
            .unwrap_or(Strategy::Passthrough)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.routes.iter().map(|route| route.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figus_core::AppConfig;
    use url::Url;

    fn config() -> RouterConfig {
        RouterConfig::from_app(&AppConfig::default()).unwrap()
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn navigate(url: &str) -> Request {
        Request::navigate(Url::parse(url).unwrap())
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(RouteTable::standard().names(), vec!["cross-origin", "api", "navigation", "non-get", "static", "fallback"]);
    }

    #[test]
    fn test_cross_origin_wins_over_everything() {
        let table = RouteTable::standard();
        let cfg = config();
        assert_eq!(table.strategy_for(&get("https://cdn.example.com/static/app.js"), &cfg), Strategy::Passthrough);
        assert_eq!(table.strategy_for(&navigate("https://accounts.example.com/"), &cfg), Strategy::Passthrough);
        assert_eq!(table.strategy_for(&get("http://localhost:9999/api/me"), &cfg), Strategy::Passthrough);
    }

    #[test]
    fn test_api_before_navigation_and_static() {
        let table = RouteTable::standard();
        let cfg = config();
        assert_eq!(table.strategy_for(&get("http://localhost:5173/api/stickers"), &cfg), Strategy::NetworkOnly);
        assert_eq!(table.strategy_for(&navigate("http://localhost:5173/api/export"), &cfg), Strategy::NetworkOnly);
        assert_eq!(table.strategy_for(&get("http://localhost:5173/api/avatar.png"), &cfg), Strategy::NetworkOnly);
    }

    #[test]
    fn test_navigation_before_static() {
        let table = RouteTable::standard();
        let cfg = config();
        assert_eq!(table.strategy_for(&navigate("http://localhost:5173/albums/3"), &cfg), Strategy::NavigationFallback);
        assert_eq!(
            table.strategy_for(&navigate("http://localhost:5173/static/help.css"), &cfg),
            Strategy::NavigationFallback
        );
    }

    fn with_method(method: &str, url: &str) -> Request {
        Request { method: method.into(), ..get(url) }
    }

    #[test]
    fn test_writes_never_reach_cache_routes() {
        let table = RouteTable::standard();
        let cfg = config();
        for method in ["POST", "PUT", "DELETE", "HEAD"] {
            let asset = with_method(method, "http://localhost:5173/stickers/import.json");
            assert_eq!(table.strategy_for(&asset, &cfg), Strategy::Passthrough, "{method}");
            let page = with_method(method, "http://localhost:5173/albums/3");
            assert_eq!(table.strategy_for(&page, &cfg), Strategy::Passthrough, "{method}");
        }
        assert_eq!(
            table.strategy_for(&with_method("POST", "http://localhost:5173/api/trades"), &cfg),
            Strategy::NetworkOnly
        );
    }

    #[test]
    fn test_static_assets() {
        let table = RouteTable::standard();
        let cfg = config();
        assert_eq!(table.strategy_for(&get("http://localhost:5173/static/app.js"), &cfg), Strategy::CacheFirst);
        assert_eq!(table.strategy_for(&get("http://localhost:5173/logo.svg?v=3"), &cfg), Strategy::CacheFirst);
        assert_eq!(table.strategy_for(&get("http://localhost:5173/assets/blob"), &cfg), Strategy::CacheFirst);
    }

    #[test]
    fn test_everything_else_network_first() {
        let table = RouteTable::standard();
        let cfg = config();
        assert_eq!(table.strategy_for(&get("http://localhost:5173/"), &cfg), Strategy::NetworkFirst);
        assert_eq!(table.strategy_for(&get("http://localhost:5173/albums/3"), &cfg), Strategy::NetworkFirst);
    }

    #[test]
    fn test_empty_table_passes_through() {
        let table = RouteTable::new();
        assert!(table.classify(&get("http://localhost:5173/"), &config()).is_none());
        assert_eq!(table.strategy_for(&get("http://localhost:5173/"), &config()), Strategy::Passthrough);
    }

    #[test]
    fn test_custom_route_order_respected() {
        let table = RouteTable::new()
            .route("everything", Strategy::NetworkOnly, |_, _| true)
            .route("never-reached", Strategy::CacheFirst, |_, _| true);
        let route = table.classify(&get("http://localhost:5173/app.js"), &config()).unwrap();
        assert_eq!(route.name, "everything");
    }
}
