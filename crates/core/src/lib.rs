//! Core types and shared functionality for the figus offline worker.
//!
//! This crate provides:
//! - Request/response values passed between the router, the cache and the network
//! - Cache storage with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheStorage, MemoryStorage, SqliteStorage};
pub use config::AppConfig;
pub use error::Error;
pub use http::{Request, RequestMode, Response};
