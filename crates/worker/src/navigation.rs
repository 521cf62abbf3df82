//! Navigation requests: network first, cache and offline page on failure.

use http::Method;
use pagekeeper_client::FetchRequest;
use pagekeeper_client::fetch::cache_key;
use pagekeeper_core::{Request, Response};

use crate::controller::CacheController;
use crate::rate_limit::{self, RATE_LIMITED_STATUS};

impl CacheController {
    /// Fetch a document navigation.
    ///
    /// Always resolves to some response: a 429 is swapped for the cached
    /// rate-limit page, and a rejected fetch falls back to the cached copy of
    /// the URL, then the offline page, then the 599 offline sentinel.
    pub async fn handle_navigation(&self, request: &Request) -> Response {
        match self.inner.network.fetch(&FetchRequest::from(request)).await {
            Ok(response) if response.status == RATE_LIMITED_STATUS => self.reshape_rate_limited(response).await,
            Ok(response) => response,
            Err(e) => {
                tracing::info!(url = %request.url, error = %e, "navigation fetch failed; serving from cache");
                self.navigation_fallback(request).await
            }
        }
    }

    /// Only GET navigations can match their own cached copy; anything else
    /// goes straight to the offline page.
    async fn navigation_fallback(&self, request: &Request) -> Response {
        if request.method == Method::GET
            && let Some(cached) = self.lookup(&cache_key(&request.url)).await
        {
            return cached;
        }

        match self.resolve(&self.inner.config.offline_path) {
            Ok(offline) => {
                if let Some(page) = self.lookup(&cache_key(&offline)).await {
                    return page;
                }
                tracing::warn!("offline page missing from cache");
            }
            Err(e) => tracing::warn!(error = %e, "cannot resolve offline page"),
        }

        Response::offline()
    }

    /// Swap a 429 for the cached rate-limit page, or pass it through if the
    /// page isn't cached.
    pub async fn reshape_rate_limited(&self, response: Response) -> Response {
        let fallback = match self.resolve(&self.inner.config.rate_limit_path) {
            Ok(url) => self.lookup(&cache_key(&url)).await,
            Err(_) => None,
        };

        match fallback {
            Some(page) => {
                tracing::debug!(retry_after = ?response.header("retry-after"), "serving rate-limit page");
                rate_limit::reshape(&response, &page, &self.inner.config.retry_after_global)
            }
            None => {
                tracing::warn!("rate-limit page missing from cache; passing 429 through");
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Harness, html, url};
    use http::{HeaderValue, header::RETRY_AFTER};
    use pagekeeper_core::Request;

    const RATE_PAGE: &str = "<!doctype html><title>Slow down</title><script>tick(window.__RETRY_AFTER__)</script>";

    #[tokio::test]
    async fn test_network_response_passes_through() {
        let harness = Harness::new();
        harness.network.respond("/blog/", html(200, "fresh"));
        harness.seed("/blog/", &html(200, "stale")).await;

        let response = harness.controller.handle_navigation(&Request::navigate(url("/blog/"))).await;
        assert_eq!(response.body, "fresh");
    }

    #[tokio::test]
    async fn test_error_status_passes_through() {
        let harness = Harness::new();
        harness.network.respond("/missing/", html(404, "not found"));
        harness.seed("/offline/", &html(200, "offline")).await;

        let response = harness.controller.handle_navigation(&Request::navigate(url("/missing/"))).await;
        assert_eq!(response.status, 404);
        assert_eq!(response.body, "not found");
    }

    #[tokio::test]
    async fn test_offline_serves_exact_cached_url() {
        let harness = Harness::new();
        harness.network.fail("/events/");
        harness.seed("/events/", &html(200, "cached events")).await;
        harness.seed("/offline/", &html(200, "offline")).await;

        let response = harness.controller.handle_navigation(&Request::navigate(url("/events/"))).await;
        assert_eq!(response.body, "cached events");
    }

    #[tokio::test]
    async fn test_offline_post_skips_cached_get_copy() {
        let harness = Harness::new();
        harness.network.fail("/contact/");
        harness.seed("/contact/", &html(200, "contact form")).await;
        harness.seed("/offline/", &html(200, "you are offline")).await;

        let request = Request { method: http::Method::POST, ..Request::navigate(url("/contact/")) };
        let response = harness.controller.handle_navigation(&request).await;
        assert_eq!(response.body, "you are offline");
    }

    #[tokio::test]
    async fn test_offline_falls_back_to_offline_page() {
        let harness = Harness::new();
        harness.network.fail("/projects/");
        harness.seed("/offline/", &html(200, "you are offline")).await;

        let response = harness.controller.handle_navigation(&Request::navigate(url("/projects/"))).await;
        assert_eq!(response.body, "you are offline");
    }

    #[tokio::test]
    async fn test_offline_with_empty_cache_returns_sentinel() {
        let harness = Harness::new();

        let response = harness.controller.handle_navigation(&Request::navigate(url("/projects/"))).await;
        assert!(response.is_offline_sentinel());
    }

    #[tokio::test]
    async fn test_rate_limited_navigation_is_reshaped() {
        let harness = Harness::new();
        let mut limited = html(429, "too many");
        limited.headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        harness.network.respond("/contact/", limited);
        harness.seed("/429/", &html(200, RATE_PAGE)).await;

        let response = harness.controller.handle_navigation(&Request::navigate(url("/contact/"))).await;

        assert_eq!(response.status, 429);
        assert_eq!(response.header("content-type"), Some("text/html"));
        let expected = RATE_PAGE.replacen("<script>", "<script>\nwindow.__RETRY_AFTER__ = \"7\";", 1);
        assert_eq!(response.text(), expected);
    }

    #[tokio::test]
    async fn test_rate_limited_without_cached_page_passes_through() {
        let harness = Harness::new();
        harness.network.respond("/contact/", html(429, "too many"));

        let response = harness.controller.handle_navigation(&Request::navigate(url("/contact/"))).await;
        assert_eq!(response.status, 429);
        assert_eq!(response.body, "too many");
    }
}
