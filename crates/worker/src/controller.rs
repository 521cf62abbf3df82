//! The cache controller and its fetch dispatch.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use http::HeaderName;
use pagekeeper_client::Network;
use pagekeeper_client::fetch::resolve;
use pagekeeper_core::{CacheStorage, Error, Request, Response, WorkerConfig};
use url::Url;

use crate::reload::ReloadCoordinator;
use crate::route::{RouteKind, classify};
use crate::scope::WorkerScope;

/// Result of handling one intercepted fetch.
///
/// `response` is what the page receives. Work that keeps running after the
/// response was handed over (cache refresh, reload broadcast) is exposed
/// through [`FetchOutcome::wait_until`] so the host can keep the event alive.
pub struct FetchOutcome {
    pub response: Response,
    background: Option<BoxFuture<'static, ()>>,
}

impl FetchOutcome {
    pub(crate) fn immediate(response: Response) -> Self {
        Self { response, background: None }
    }

    pub(crate) fn with_background(response: Response, background: BoxFuture<'static, ()>) -> Self {
        Self { response, background: Some(background) }
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// Wait for any background work started by this fetch.
    pub async fn wait_until(&mut self) {
        if let Some(background) = self.background.take() {
            background.await;
        }
    }
}

impl std::fmt::Debug for FetchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOutcome")
            .field("response", &self.response)
            .field("background", &self.background.is_some())
            .finish()
    }
}

pub(crate) struct Inner {
    pub(crate) config: WorkerConfig,
    pub(crate) origin: Url,
    pub(crate) hash_header: HeaderName,
    pub(crate) storage: Arc<dyn CacheStorage>,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) scope: Arc<dyn WorkerScope>,
    pub(crate) reload: ReloadCoordinator,
}

/// Long-lived controller owning the cache generation and reload latch.
///
/// Cheap to clone; every clone shares the same latch and backends.
#[derive(Clone)]
pub struct CacheController {
    pub(crate) inner: Arc<Inner>,
}

impl CacheController {
    /// Build a controller from validated configuration and platform services.
    pub fn new(
        config: WorkerConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, scope: Arc<dyn WorkerScope>,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin)?;
        let hash_header = HeaderName::from_bytes(config.hash_header.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("hash_header: {e}")))?;
        let reload = ReloadCoordinator::new(scope.clone());

        Ok(Self { inner: Arc::new(Inner { config, origin, hash_header, storage, network, scope, reload }) })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    pub fn reload(&self) -> &ReloadCoordinator {
        &self.inner.reload
    }

    /// Resolve a path or absolute URL against the configured origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.inner.origin, input).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Handle an intercepted request.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        let route = classify(&request, &self.inner.config);
        tracing::debug!(url = %request.url, ?route, "intercepted fetch");

        match route {
            RouteKind::Navigation => FetchOutcome::immediate(self.handle_navigation(&request).await),
            RouteKind::CacheableAsset => self.handle_cacheable_asset(request).await,
            RouteKind::PassthroughAsset => self.handle_passthrough(&request).await,
        }
    }

    /// Look up `key` in the current generation. Storage errors count as a miss.
    pub(crate) async fn lookup(&self, key: &str) -> Option<Response> {
        let name = self.inner.config.cache_name();
        match self.inner.storage.match_url(&name, key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, MockNetwork, MockScope, config, css, html, url};
    use pagekeeper_core::MemoryCacheStorage;

    #[test]
    fn test_new_rejects_bad_origin() {
        let cfg = WorkerConfig { origin: "::nope".into(), ..config() };
        let result = CacheController::new(
            cfg,
            Arc::new(MemoryCacheStorage::new()),
            MockNetwork::new(),
            MockScope::with_clients(&[]),
        );
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_against_origin() {
        let harness = Harness::new();
        let resolved = harness.controller.resolve("/blog/?page=2#top").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/blog/?page=2");
    }

    #[tokio::test]
    async fn test_dispatch_navigation() {
        let harness = Harness::new();
        harness.network.respond("/about/", html(200, "<h1>About</h1>"));

        let outcome = harness.controller.handle_fetch(Request::navigate(url("/about/"))).await;
        assert_eq!(outcome.response.body, "<h1>About</h1>");
        assert!(!outcome.has_background());
    }

    #[tokio::test]
    async fn test_dispatch_cacheable_asset_populates_cache() {
        let harness = Harness::new();
        harness.network.respond("/site.css", css("body {}"));

        let mut outcome = harness.controller.handle_fetch(Request::get(url("/site.css"))).await;
        outcome.wait_until().await;

        assert_eq!(outcome.response.body, "body {}");
        assert!(harness.cached("/site.css").await.is_some());
    }

    #[tokio::test]
    async fn test_dispatch_passthrough_skips_cache() {
        let harness = Harness::new();
        harness.network.respond("/api/events", html(200, "[]"));

        let outcome = harness.controller.handle_fetch(Request::get(url("/api/events"))).await;
        assert_eq!(outcome.response.status, 200);
        assert_eq!(harness.storage.stats(), Default::default());
    }
}
