//! pagekeeper entry point.
//!
//! Boots the cache controller behind the stdio host. Logging goes to stderr
//! so it never mixes with protocol records on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use pagekeeper_client::{FetchConfig, HttpFetcher};
use pagekeeper_core::{CacheDb, CacheStorage, MemoryCacheStorage, WorkerConfig};
use pagekeeper_worker::{CacheController, StdioScope, host};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load().context("loading configuration")?;

    let storage: Arc<dyn CacheStorage> = match &config.db_path {
        Some(path) => Arc::new(CacheDb::open(path).await.context("opening cache database")?),
        None => Arc::new(MemoryCacheStorage::new()),
    };
    let network = Arc::new(HttpFetcher::new(FetchConfig::from(&config))?);
    let (scope, outputs) = StdioScope::new();

    tracing::info!(cache = %config.cache_name(), origin = %config.origin, "starting pagekeeper on stdio");

    let controller = CacheController::new(config, storage, network, scope.clone())?;
    host::run(controller, scope, outputs, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    tracing::info!("input closed; shutting down");
    Ok(())
}
