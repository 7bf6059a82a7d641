//! The request router: lifecycle handlers plus fetch dispatch.
//!
//! [`RequestRouter`] is platform independent. A host adapter feeds it
//! install/activate/message/fetch events and acts on the results.

use crate::background::Background;
use crate::config::RouterConfig;
use crate::lifecycle::{self, ActivationReport, ClientControl, InstallReport, Lifecycle, LifecycleState};
use crate::message::WorkerMessage;
use crate::routes::{RouteTable, Strategy};
use crate::strategy;
use figus_client::Fetcher;
use figus_core::{CacheStorage, Error, Request, Response};
use std::sync::Arc;

/// Result of handling an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs its default network handling.
    Passthrough,
    /// Answer the page with this response.
    Respond(Response),
}

/// State shared with strategies and background tasks.
pub(crate) struct Shared {
    pub(crate) config: RouterConfig,
    pub(crate) storage: Arc<dyn CacheStorage>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) background: Background,
}

impl Shared {
    /// Entry for `url` in the current generation. Read errors count as a miss.
    pub(crate) async fn cached(&self, url: &str) -> Option<Response> {
        match self.storage.match_url(&self.config.cache_name, url).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    pub(crate) async fn store(&self, url: &str, response: &Response) {
        if let Err(e) = self.storage.put(&self.config.cache_name, url, response).await {
            tracing::warn!(url, error = %e, "cache write failed");
        }
    }

    /// Write `response` to the cache without holding up the caller.
    ///
    /// `response` must be a clone; the original goes back to the page.
    pub(crate) fn store_in_background(self: &Arc<Self>, url: String, response: Response) {
        let shared = Arc::clone(self);
        self.background.spawn(async move {
            shared.store(&url, &response).await;
        });
    }
}

/// Offline cache router for one deployed version.
pub struct RequestRouter {
    shared: Arc<Shared>,
    routes: RouteTable,
    lifecycle: Lifecycle,
    clients: Arc<dyn ClientControl>,
}

impl RequestRouter {
    /// Create a router using the standard route table.
    pub fn new(
        config: RouterConfig, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>,
        clients: Arc<dyn ClientControl>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared { config, storage, fetcher, background: Background::new() }),
            routes: RouteTable::standard(),
            lifecycle: Lifecycle::default(),
            clients,
        }
    }

    /// Replace the route table.
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.shared.config
    }

    pub fn cache_name(&self) -> &str {
        &self.shared.config.cache_name
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.shared.storage
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether skip-waiting has been requested for this version.
    pub fn skip_waiting_requested(&self) -> bool {
        self.lifecycle.skip_waiting_requested()
    }

    /// Wait for pending background cache writes and refreshes.
    pub async fn flush(&self) {
        self.shared.background.flush().await;
    }

    /// Populate the current generation with the precache set.
    ///
    /// On failure nothing is stored and this version becomes redundant; any
    /// previously active generation is left untouched.
    pub async fn handle_install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.begin_install()?;
        tracing::info!(cache = %self.cache_name(), "installing");

        match lifecycle::precache(&self.shared).await {
            Ok(precached) => {
                self.lifecycle.finish_install(true);
                self.lifecycle.skip_waiting();
                tracing::info!(cache = %self.cache_name(), precached, "installed");
                Ok(InstallReport { cache_name: self.cache_name().to_string(), precached, skip_waiting: true })
            }
            Err(e) => {
                self.lifecycle.finish_install(false);
                tracing::warn!(cache = %self.cache_name(), error = %e, "install failed");
                Err(e)
            }
        }
    }

    /// Evict stale generations, then claim open pages.
    ///
    /// Eviction is best-effort: neither a failed deletion nor a failed
    /// listing of caches prevents claiming clients.
    pub async fn handle_activate(&self) -> Result<ActivationReport, Error> {
        self.lifecycle.begin_activate()?;
        tracing::info!(cache = %self.cache_name(), "activating");

        let (deleted, failed) = match lifecycle::evict_stale(&self.shared).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "could not list cache generations");
                (Vec::new(), Vec::new())
            }
        };

        let clients_claimed = match self.clients.claim().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "failed to claim clients");
                0
            }
        };

        self.lifecycle.finish_activate();
        tracing::info!(cache = %self.cache_name(), deleted = deleted.len(), clients_claimed, "activated");

        Ok(ActivationReport { cache_name: self.cache_name().to_string(), deleted, failed, clients_claimed })
    }

    /// Apply an inbound message. Returns true when the host should activate now.
    pub fn handle_message(&self, message: WorkerMessage) -> bool {
        match message {
            WorkerMessage::SkipWaiting => {
                let activate_now = self.lifecycle.skip_waiting();
                tracing::info!(activate_now, "skip waiting requested");
                activate_now
            }
        }
    }

    /// Parse and apply a raw JSON message.
    pub fn handle_message_json(&self, raw: &str) -> Result<bool, Error> {
        let message = WorkerMessage::from_json(raw).inspect_err(|e| {
            tracing::debug!(error = %e, "ignoring unrecognised message");
        })?;
        Ok(self.handle_message(message))
    }

    /// Classify and serve one intercepted request.
    ///
    /// Errors are failed fetches with no fallback; the page sees them as a
    /// network error.
    pub async fn handle_fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        let strategy = self.routes.strategy_for(&request, &self.shared.config);
        tracing::debug!(url = %request.url, ?strategy, "routing request");

        let response = match strategy {
            Strategy::Passthrough => return Ok(FetchOutcome::Passthrough),
            Strategy::NetworkOnly => strategy::network_only(&self.shared, &request).await,
            Strategy::NavigationFallback => strategy::navigation_fallback(&self.shared, &request).await?,
            Strategy::CacheFirst => strategy::cache_first(&self.shared, &request).await?,
            Strategy::NetworkFirst => strategy::network_first(&self.shared, &request).await?,
        };

        Ok(FetchOutcome::Respond(response))
    }
}
