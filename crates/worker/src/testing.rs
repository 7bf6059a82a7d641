//! Test doubles for the network, the cache store and client control.

use crate::lifecycle::ClientControl;
use async_trait::async_trait;
use figus_client::Fetcher;
use figus_core::cache::CacheUsage;
use figus_core::{CacheStorage, Error, MemoryStorage, Request, Response};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn app_url(path: &str) -> String {
    format!("http://localhost:5173{path}")
}

/// Fetcher answering from a table of canned responses.
///
/// Unknown URLs get a 404. Offline mode and per-URL failures produce
/// `Error::Network`.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Response>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&url) {
            return Err(Error::Network(format!("{url}: offline")));
        }

        let scripted = self.responses.lock().unwrap().get(&url).cloned();
        Ok(scripted.unwrap_or_else(|| Response::new(url, 404, "not found")))
    }
}

/// Storage wrapper recording every call, with optional injected failures.
pub struct SpyStorage {
    inner: MemoryStorage,
    ops: Mutex<Vec<String>>,
    failing_reads: bool,
    failing_deletes: HashSet<String>,
}

impl SpyStorage {
    pub fn new(inner: MemoryStorage) -> Self {
        Self { inner, ops: Mutex::new(Vec::new()), failing_reads: false, failing_deletes: HashSet::new() }
    }

    pub fn failing_reads(mut self) -> Self {
        self.failing_reads = true;
        self
    }

    pub fn failing_delete(mut self, name: &str) -> Self {
        self.failing_deletes.insert(name.to_string());
        self
    }

    /// The wrapped storage; calls through it are not recorded.
    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: &str, target: &str) {
        self.ops.lock().unwrap().push(format!("{op} {target}"));
    }
}

#[async_trait]
impl CacheStorage for SpyStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.record("open", name);
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.record("has", name);
        self.inner.has(name).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.record("names", "*");
        self.inner.names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.record("delete", name);
        if self.failing_deletes.contains(name) {
            return Err(Error::CorruptEntry(format!("{name}: injected delete failure")));
        }
        self.inner.delete(name).await
    }

    async fn match_url(&self, name: &str, url: &str) -> Result<Option<Response>, Error> {
        self.record("match", url);
        if self.failing_reads {
            return Err(Error::CorruptEntry(format!("{url}: injected")));
        }
        self.inner.match_url(name, url).await
    }

    async fn put(&self, name: &str, url: &str, response: &Response) -> Result<(), Error> {
        self.record("put", url);
        self.inner.put(name, url, response).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> Result<(), Error> {
        self.record("put_all", name);
        self.inner.put_all(name, entries).await
    }

    async fn delete_entry(&self, name: &str, url: &str) -> Result<bool, Error> {
        self.record("delete_entry", url);
        self.inner.delete_entry(name, url).await
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        self.record("keys", name);
        self.inner.keys(name).await
    }

    async fn usage(&self, name: &str) -> Result<CacheUsage, Error> {
        self.record("usage", name);
        self.inner.usage(name).await
    }
}

/// Client control reporting a fixed number of open pages.
pub struct CountingClients {
    open_pages: usize,
    claims: AtomicUsize,
}

impl CountingClients {
    pub fn new(open_pages: usize) -> Self {
        Self { open_pages, claims: AtomicUsize::new(0) }
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientControl for CountingClients {
    async fn claim(&self) -> Result<usize, Error> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(self.open_pages)
    }
}
