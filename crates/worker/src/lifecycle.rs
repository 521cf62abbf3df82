//! Install and activate.
//!
//! Install builds the current generation from a fixed asset list. Activate
//! evicts every other generation, refreshes the fallback documents, claims
//! open pages, and reloads them once if no stylesheet has been cached yet.

use futures_util::future::{join_all, try_join_all};
use pagekeeper_client::FetchRequest;
use pagekeeper_client::fetch::{cache_bust, cache_key, is_stylesheet};
use pagekeeper_core::{Error, Generation};
use serde::Serialize;
use url::Url;

use crate::controller::CacheController;

/// What install stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    /// Cache keys written, in precache order.
    pub cached: Vec<String>,
}

/// What activate managed to do. Every step is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub evicted: Vec<String>,
    pub fallbacks_refreshed: bool,
    pub claimed: bool,
    pub reload_requested: bool,
}

impl CacheController {
    /// Populate the current generation with the static assets and both
    /// fallback documents, then ask to activate immediately.
    ///
    /// # Errors
    ///
    /// Fails if any precache fetch is rejected or returns a non-2xx status.
    /// Entries stored before the failure are left in place.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let cache_name = self.inner.config.cache_name();
        let result = match Generation::open(self.inner.storage.clone(), cache_name.clone()).await {
            Ok(generation) => self.add_all_with_bypass(&generation, &self.inner.config.precache_paths()).await,
            Err(e) => Err(e),
        };

        if let Err(e) = self.inner.scope.skip_waiting().await {
            tracing::warn!(error = %e, "skip_waiting failed");
        }

        let cached = result?;
        tracing::info!(cache = %cache_name, entries = cached.len(), "install complete");
        Ok(InstallReport { cache_name, cached })
    }

    /// Fetch every path from the network, bypassing HTTP caches, and store
    /// each response under its plain URL.
    ///
    /// The request URL carries a timestamp query parameter; the cache key
    /// does not.
    pub async fn add_all_with_bypass(&self, generation: &Generation, paths: &[&str]) -> Result<Vec<String>, Error> {
        let stamp = chrono::Utc::now().timestamp_millis();
        try_join_all(paths.iter().map(|path| self.fetch_and_store(generation, path, stamp))).await
    }

    async fn fetch_and_store(&self, generation: &Generation, path: &str, stamp: i64) -> Result<String, Error> {
        let url = self.resolve(path)?;
        let request = FetchRequest::get(cache_bust(&url, stamp)).bypass_cache();

        let response = self
            .inner
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::Network(format!("{url}: {e}")))?;

        if !response.ok() {
            return Err(Error::InstallFailed { url: url.to_string(), status: response.status });
        }

        let key = cache_key(&url);
        generation.put(&key, &response).await?;
        tracing::debug!(%key, "precached");
        Ok(key)
    }

    /// Promote the current generation.
    ///
    /// Steps run in order and a failing step never blocks the ones after it.
    pub async fn activate(&self) -> ActivateReport {
        let current = self.inner.config.cache_name();
        let mut report = ActivateReport { evicted: self.evict_stale_generations(&current).await, ..Default::default() };

        report.fallbacks_refreshed = match Generation::open(self.inner.storage.clone(), current.clone()).await {
            Ok(generation) => match self.add_all_with_bypass(&generation, &self.inner.config.fallback_paths()).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to refresh fallback documents");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to open current generation");
                false
            }
        };

        report.claimed = match self.inner.scope.claim().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to claim clients");
                false
            }
        };

        if self.is_first_activation(&current).await
            && let Some(broadcast) = self.inner.reload.request_reload()
        {
            tracing::info!("no stylesheets cached yet; reloading controlled pages");
            if let Err(e) = broadcast.await {
                tracing::warn!(error = %e, "reload broadcast task aborted");
            }
            report.reload_requested = true;
        }

        tracing::info!(
            cache = %current,
            evicted = report.evicted.len(),
            fallbacks_refreshed = report.fallbacks_refreshed,
            claimed = report.claimed,
            reload_requested = report.reload_requested,
            "activate complete"
        );
        report
    }

    /// Delete every generation except `current`. Returns the names removed.
    async fn evict_stale_generations(&self, current: &str) -> Vec<String> {
        let names = match self.inner.storage.names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list cache generations");
                return Vec::new();
            }
        };

        let stale: Vec<String> = names.into_iter().filter(|name| name != current).collect();
        let results = join_all(stale.iter().map(|name| self.inner.storage.delete(name))).await;

        stale
            .into_iter()
            .zip(results)
            .filter_map(|(name, result)| match result {
                Ok(_) => Some(name),
                Err(e) => {
                    tracing::warn!(cache = %name, error = %e, "failed to delete stale generation");
                    None
                }
            })
            .collect()
    }

    /// True when the current generation holds no stylesheet at all, meaning
    /// the open pages loaded before any controller could observe them.
    async fn is_first_activation(&self, current: &str) -> bool {
        let extension = &self.inner.config.stylesheet_extension;
        match self.inner.storage.keys(current).await {
            Ok(keys) => !keys.iter().any(|key| match Url::parse(key) {
                Ok(url) => is_stylesheet(&url, extension),
                Err(_) => key.ends_with(extension.as_str()),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list cache keys");
                false
            }
        }
    }
}
