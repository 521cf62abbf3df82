//! Network client for pagekeeper.
//!
//! This crate provides the `Network` seam the cache controller fetches
//! through, a reqwest-backed implementation, and URL helpers for cache keys
//! and cache-busting requests.

pub mod fetch;

pub use fetch::{CacheMode, FetchConfig, FetchError, FetchRequest, HttpFetcher, Network, UrlError};
