//! Per-route handling strategies.
//!
//! A fetch error from the network means "no response"; an HTTP error status
//! is still a response and is returned as-is. Cache read errors count as
//! misses.

use crate::router::Shared;
use figus_core::{Error, Request, Response};
use std::sync::Arc;

/// Network only. A failed fetch becomes a synthetic 503 JSON response.
pub(crate) async fn network_only(shared: &Shared, request: &Request) -> Response {
    match shared.fetcher.fetch(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "api request failed, answering 503");
            Response::service_unavailable_json()
        }
    }
}

/// Network first; on failure the precached offline page.
///
/// Never looks for a cached copy of the navigated URL itself.
pub(crate) async fn navigation_fallback(shared: &Shared, request: &Request) -> Result<Response, Error> {
    let err = match shared.fetcher.fetch(request).await {
        Ok(response) => return Ok(response),
        Err(e) => e,
    };

    let offline = shared.config.offline_fallback_url()?;
    match shared.cached(offline.as_str()).await {
        Some(page) => {
            tracing::debug!(url = %request.url, "navigation offline, serving fallback page");
            Ok(page)
        }
        None => {
            tracing::warn!(url = %request.url, "navigation offline and no fallback page cached");
            Err(err)
        }
    }
}

/// Cache first with a background refresh of hits; network and store on a miss.
///
/// Requests that are not cacheable go straight to the network.
pub(crate) async fn cache_first(shared: &Arc<Shared>, request: &Request) -> Result<Response, Error> {
    let Some(key) = request.cache_key() else {
        return shared.fetcher.fetch(request).await;
    };

    if let Some(cached) = shared.cached(&key).await {
        tracing::debug!(url = %key, "cache hit, revalidating in background");
        let refresh = Arc::clone(shared);
        let request = request.clone();
        shared.background.spawn(async move {
            match refresh.fetcher.fetch(&request).await {
                Ok(fresh) if fresh.ok() => refresh.store(&key, &fresh).await,
                Ok(fresh) => tracing::debug!(url = %key, status = fresh.status, "refresh not stored"),
                Err(e) => tracing::debug!(url = %key, error = %e, "background refresh failed"),
            }
        });
        return Ok(cached);
    }

    let response = shared.fetcher.fetch(request).await?;
    if response.ok() {
        shared.store_in_background(key, response.clone());
    }
    Ok(response)
}

/// Network first; on failure whatever the cache holds for the same URL.
pub(crate) async fn network_first(shared: &Arc<Shared>, request: &Request) -> Result<Response, Error> {
    let key = request.cache_key();

    match shared.fetcher.fetch(request).await {
        Ok(response) => {
            // Static paths are routed to cache-first, so in the standard table this never stores.
            if let Some(key) = key
                && response.ok()
                && shared.config.is_static_path(request.path())
            {
                shared.store_in_background(key, response.clone());
            }
            Ok(response)
        }
        Err(e) => {
            let Some(key) = key else { return Err(e) };
            match shared.cached(&key).await {
                Some(cached) => {
                    tracing::debug!(url = %key, "network failed, serving cached copy");
                    Ok(cached)
                }
                None => Err(e),
            }
        }
    }
}
