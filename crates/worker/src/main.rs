//! figus-worker entry point.
//!
//! Reads worker events as JSON lines on stdin and writes replies to stdout.
//! Logging goes to stderr to keep stdout a clean reply stream.

use anyhow::Result;
use figus_client::{FetchConfig, Fetcher, HttpFetcher};
use figus_core::config::StorageBackend;
use figus_core::{AppConfig, CacheStorage, MemoryStorage, SqliteStorage};
use figus_worker::{Adapter, ClientsHandle, RequestRouter, RouterConfig};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(cache = %config.cache_name(), origin = %config.origin, "starting figus-worker");

    let storage: Arc<dyn CacheStorage> = match config.storage {
        StorageBackend::Sqlite => Arc::new(SqliteStorage::open(&config.db_path).await?),
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    };
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(FetchConfig::from(&config))?);
    let clients = ClientsHandle::new();

    let router = RequestRouter::new(RouterConfig::from_app(&config)?, storage, fetcher.clone(), Arc::new(clients.clone()));
    let adapter = Adapter::new(Arc::new(router), fetcher, clients);

    adapter.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    tracing::info!("event stream closed");

    Ok(())
}
