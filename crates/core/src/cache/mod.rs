//! Named, versioned response caches.
//!
//! A cache generation is a named store of responses keyed by full request
//! URL. The [`CacheStorage`] trait is the seam the router talks to; two
//! backends implement it:
//!
//! - [`SqliteStorage`]: persistent, tokio-rusqlite backed, WAL mode
//! - [`MemoryStorage`]: in-process map, for tests and throwaway runs
//!
//! Concurrent writes to the same key are last-write-wins; no extra locking
//! is layered on top of what each backend already provides.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::Error;
use crate::Response;

pub use connection::SqliteStorage;
pub use memory::MemoryStorage;

/// Size of one cache generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheUsage {
    pub entries: u64,
    pub bytes: u64,
}

/// Key-value response store partitioned into named caches.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named cache if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), Error>;

    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// All cache names, sorted.
    async fn names(&self) -> Result<Vec<String>, Error>;

    /// Remove a whole cache and its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Look up the entry stored under `url`. Never creates the cache.
    async fn match_url(&self, name: &str, url: &str) -> Result<Option<Response>, Error>;

    /// Store `response` under `url`, replacing any previous entry.
    async fn put(&self, name: &str, url: &str, response: &Response) -> Result<(), Error>;

    /// Store every entry or none of them.
    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> Result<(), Error>;

    async fn delete_entry(&self, name: &str, url: &str) -> Result<bool, Error>;

    /// URLs stored in the named cache, sorted. Empty if the cache is absent.
    async fn keys(&self, name: &str) -> Result<Vec<String>, Error>;

    async fn usage(&self, name: &str) -> Result<CacheUsage, Error>;
}
