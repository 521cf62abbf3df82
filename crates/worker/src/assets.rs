//! Sub-resource requests.
//!
//! Cacheable assets are served stale-while-revalidate: a cached copy is
//! returned at once while a detached task refetches the asset, stores it with
//! its content hash and requests a reload if the hash changed. Everything else
//! goes straight to the network.

use futures_util::FutureExt;
use http::HeaderValue;
use pagekeeper_client::fetch::cache_key;
use pagekeeper_client::{FetchError, FetchRequest};
use pagekeeper_core::{Generation, Request, Response, content_hash};

use crate::controller::{CacheController, FetchOutcome};
use crate::rate_limit::RATE_LIMITED_STATUS;

impl CacheController {
    /// Serve a cacheable asset, cache first, refreshing in the background.
    pub async fn handle_cacheable_asset(&self, request: Request) -> FetchOutcome {
        let key = cache_key(&request.url);

        let generation = match Generation::open(self.inner.storage.clone(), self.inner.config.cache_name()).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(error = %e, "failed to open cache generation");
                None
            }
        };

        let cached = match &generation {
            Some(generation) => generation.get(&key).await.unwrap_or_else(|e| {
                tracing::warn!(%key, error = %e, "cache lookup failed");
                None
            }),
            None => None,
        };

        // Some(None) marks a cached entry that carries no hash header.
        let previous_hash = cached
            .as_ref()
            .map(|c| c.headers.get(&self.inner.hash_header).and_then(|v| v.to_str().ok()).map(str::to_owned));

        let url = request.url.clone();
        let this = self.clone();
        let refresh = tokio::spawn(async move { this.refresh_asset(request, key, generation, previous_hash).await });

        match cached {
            Some(response) => {
                tracing::debug!(%url, "serving cached asset");
                let background = async move {
                    match refresh.await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::debug!(error = %e, "background refresh failed"),
                        Err(e) => tracing::warn!(error = %e, "background refresh task aborted"),
                    }
                }
                .boxed();
                FetchOutcome::with_background(response, background)
            }
            None => {
                let response = match refresh.await {
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => {
                        tracing::info!(%url, error = %e, "asset fetch failed with nothing cached");
                        Response::offline()
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "asset fetch task aborted");
                        Response::offline()
                    }
                };
                FetchOutcome::immediate(response)
            }
        }
    }

    /// Refetch an asset, store a hashed copy, and flag stale pages.
    ///
    /// Only exact 200 responses are stored. `previous_hash` is `Some` when the
    /// asset was already cached before this fetch started.
    async fn refresh_asset(
        &self, request: Request, key: String, generation: Option<Generation>, previous_hash: Option<Option<String>>,
    ) -> Result<Response, FetchError> {
        let response = self.inner.network.fetch(&FetchRequest::from(&request)).await?;
        if response.status != 200 {
            tracing::debug!(%key, status = response.status, "not caching non-200 asset");
            return Ok(response);
        }

        let hash = content_hash(&response.body);
        let Ok(value) = HeaderValue::from_str(&hash) else {
            return Ok(response);
        };
        let stored = response.with_header(self.inner.hash_header.clone(), value);

        if let Some(generation) = &generation
            && let Err(e) = generation.put(&key, &stored).await
        {
            tracing::warn!(%key, error = %e, "failed to store refreshed asset");
        }

        if let Some(previous) = previous_hash
            && previous.as_deref() != Some(hash.as_str())
        {
            tracing::info!(%key, previous = ?previous, current = %hash, "cached asset changed; requesting reload");
            if let Some(broadcast) = self.inner.reload.request_reload()
                && let Err(e) = broadcast.await
            {
                tracing::warn!(error = %e, "reload broadcast task aborted");
            }
        }

        Ok(stored)
    }

    /// Forward a non-cacheable request to the network.
    ///
    /// A 429 here triggers a page reload so the navigation path can serve the
    /// rate-limit page; a rejected fetch becomes the 599 offline sentinel.
    pub async fn handle_passthrough(&self, request: &Request) -> FetchOutcome {
        match self.inner.network.fetch(&FetchRequest::from(request)).await {
            Ok(response) if response.status == RATE_LIMITED_STATUS => {
                tracing::info!(url = %request.url, "sub-resource rate limited; requesting reload");
                match self.inner.reload.request_reload() {
                    Some(broadcast) => {
                        let background = async move {
                            if let Err(e) = broadcast.await {
                                tracing::warn!(error = %e, "reload broadcast task aborted");
                            }
                        }
                        .boxed();
                        FetchOutcome::with_background(response, background)
                    }
                    None => FetchOutcome::immediate(response),
                }
            }
            Ok(response) => FetchOutcome::immediate(response),
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "passthrough fetch failed");
                FetchOutcome::immediate(Response::offline())
            }
        }
    }
}
