//! Core types and shared functionality for pagekeeper.
//!
//! This crate provides:
//! - Request and response types shared by the network layer and the cache
//! - Cache storage trait with in-memory and SQLite backends
//! - Content hashing for stale asset detection
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use cache::{CacheDb, CacheStorage, Generation, MemoryCacheStorage, content_hash};
pub use config::{ConfigError, WorkerConfig};
pub use error::Error;
pub use request::{Request, RequestMode};
pub use response::{OFFLINE_STATUS, OFFLINE_STATUS_TEXT, Response};
