//! Install/activate lifecycle of a cache generation.
//!
//! Install stores the whole precache set in the current generation or
//! nothing at all. Activate evicts every other generation and takes control
//! of open pages. The hosting platform serialises these events; the state
//! machine here only guards against activating a version that never
//! installed.

use crate::router::Shared;
use async_trait::async_trait;
use figus_core::{Error, Request, Response};
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    Activated,
    /// Install failed; this version never becomes current.
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Platform API for taking control of already open pages.
#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Route every open page through this version. Returns how many were claimed.
    async fn claim(&self) -> Result<usize, Error>;
}

/// Client control for hosts with no pages to claim.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClients;

#[async_trait]
impl ClientControl for NoClients {
    async fn claim(&self) -> Result<usize, Error> {
        Ok(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    pub precached: usize,
    /// Whether this version asked to skip the waiting phase.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub cache_name: String,
    /// Stale generations removed.
    pub deleted: Vec<String>,
    /// Stale generations whose deletion failed; left for the next activation.
    pub failed: Vec<String>,
    pub clients_claimed: usize,
}

struct Inner {
    state: LifecycleState,
    skip_waiting: bool,
}

/// Lifecycle state of one worker version.
pub struct Lifecycle {
    inner: Mutex<Inner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self { inner: Mutex::new(Inner { state: LifecycleState::Parsed, skip_waiting: false }) }
    }
}

impl Lifecycle {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.lock().skip_waiting
    }

    pub(crate) fn begin_install(&self) -> Result<(), Error> {
        let mut inner = self.lock();
        match inner.state {
            LifecycleState::Parsed | LifecycleState::Redundant => {
                inner.state = LifecycleState::Installing;
                Ok(())
            }
            state => Err(Error::InvalidInput(format!("cannot install from state {state}"))),
        }
    }

    pub(crate) fn finish_install(&self, ok: bool) {
        self.lock().state = if ok { LifecycleState::Installed } else { LifecycleState::Redundant };
    }

    /// Remember the skip-waiting request. Returns true when a waiting
    /// install should activate right now.
    pub(crate) fn skip_waiting(&self) -> bool {
        let mut inner = self.lock();
        inner.skip_waiting = true;
        inner.state == LifecycleState::Installed
    }

    pub(crate) fn begin_activate(&self) -> Result<(), Error> {
        let mut inner = self.lock();
        match inner.state {
            LifecycleState::Installed | LifecycleState::Activated => {
                inner.state = LifecycleState::Activating;
                Ok(())
            }
            state => Err(Error::InvalidInput(format!("cannot activate from state {state}"))),
        }
    }

    pub(crate) fn finish_activate(&self) {
        self.lock().state = LifecycleState::Activated;
    }
}

/// Fetch the whole precache set and store it in one bulk write.
///
/// Any fetch error or non-ok status aborts before anything is written.
pub(crate) async fn precache(shared: &Shared) -> Result<usize, Error> {
    let cache_name = &shared.config.cache_name;
    shared.storage.open(cache_name).await?;

    let mut entries: Vec<(String, Response)> = Vec::with_capacity(shared.config.precache.len());
    for url in shared.config.precache_urls()? {
        let key = url.to_string();
        let response = shared
            .fetcher
            .fetch(&Request::get(url))
            .await
            .map_err(|e| Error::PrecacheFailed { url: key.clone(), reason: e.to_string() })?;

        if !response.ok() {
            return Err(Error::PrecacheFailed { url: key, reason: format!("status {}", response.status) });
        }
        entries.push((key, response));
    }

    let count = entries.len();
    shared.storage.put_all(cache_name, entries).await?;
    Ok(count)
}

/// Delete every generation other than the current one.
///
/// Each deletion is attempted independently; failures are collected, not raised.
pub(crate) async fn evict_stale(shared: &Shared) -> Result<(Vec<String>, Vec<String>), Error> {
    let current = &shared.config.cache_name;
    let mut deleted = Vec::new();
    let mut failed = Vec::new();

    for name in shared.storage.names().await? {
        if &name == current {
            continue;
        }
        match shared.storage.delete(&name).await {
            Ok(_) => {
                tracing::info!(cache = %name, "deleted stale cache generation");
                deleted.push(name);
            }
            Err(e) => {
                tracing::warn!(cache = %name, error = %e, "failed to delete stale cache generation");
                failed.push(name);
            }
        }
    }

    Ok((deleted, failed))
}
