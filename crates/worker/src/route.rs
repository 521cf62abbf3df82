//! Request routing.

use http::Method;
use pagekeeper_client::fetch::is_stylesheet;
use pagekeeper_core::{Request, WorkerConfig};

/// How an intercepted request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Network first, cache and offline page on failure, 429 reshaping.
    Navigation,
    /// Stale-while-revalidate with content-hash staleness detection.
    CacheableAsset,
    /// Straight to the network, never touching the cache.
    PassthroughAsset,
}

/// Decide how to handle `request`.
///
/// Sub-resources are cacheable when their path is one of the fixed static
/// assets or ends in the stylesheet extension. Only GET is ever cached.
pub fn classify(request: &Request, config: &WorkerConfig) -> RouteKind {
    if request.is_navigation() {
        return RouteKind::Navigation;
    }
    if request.method != Method::GET {
        return RouteKind::PassthroughAsset;
    }

    let path = request.url.path();
    if config.static_assets.iter().any(|asset| asset == path) || is_stylesheet(&request.url, &config.stylesheet_extension)
    {
        RouteKind::CacheableAsset
    } else {
        RouteKind::PassthroughAsset
    }
}
