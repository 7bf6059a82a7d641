//! Client code for the figus worker.
//!
//! This crate provides the network side of request handling: the `Fetcher`
//! seam the router depends on, its reqwest implementation, and URL helpers.

pub mod fetch;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, resolve, same_origin};
