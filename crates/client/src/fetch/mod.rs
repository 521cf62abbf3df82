//! Network fetch pipeline used by the cache controller.
//!
//! ### Contract
//! - Any HTTP status (including 4xx/5xx) is a successful fetch
//! - A rejected fetch (offline, DNS failure, reset) is a `FetchError`
//! - No request timeout is configured; in-flight requests run until the
//!   transport gives up
//!
//! ### Cache bypass
//! - `CacheMode::Reload` sends `Cache-Control: no-cache` and `Pragma: no-cache`
//!   so intermediaries revalidate with the origin.

pub mod url;

use std::sync::Arc;

use async_trait::async_trait;
use pagekeeper_core::Response;
use reqwest::{Client, Method, header};

pub use url::{CACHE_BUST_PARAM, UrlError, cache_bust, cache_key, is_stylesheet, resolve};

/// HTTP-level caching behaviour for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    /// Skip every HTTP cache and go to the origin.
    Reload,
}

/// A request handed to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: ::url::Url,
    pub cache_mode: CacheMode,
}

impl FetchRequest {
    pub fn get(url: ::url::Url) -> Self {
        Self { method: Method::GET, url, cache_mode: CacheMode::Default }
    }

    pub fn bypass_cache(mut self) -> Self {
        self.cache_mode = CacheMode::Reload;
        self
    }
}

impl From<&pagekeeper_core::Request> for FetchRequest {
    fn from(request: &pagekeeper_core::Request) -> Self {
        Self { method: request.method.clone(), url: request.url.clone(), cache_mode: CacheMode::Default }
    }
}

/// Errors from a rejected fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// The transport timed out.
    #[error("request timeout")]
    Timeout,

    /// Headers arrived but the body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// No connection to the origin could be established.
    #[error("offline: {0}")]
    Offline(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Offline(err.to_string())
        } else {
            FetchError::Network(Arc::new(err))
        }
    }
}

/// Anything that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "pagekeeper/0.1")
    pub user_agent: String,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "pagekeeper/0.1".to_string(), max_redirects: 5 }
    }
}

impl From<&pagekeeper_core::WorkerConfig> for FetchConfig {
    fn from(config: &pagekeeper_core::WorkerConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), ..Default::default() }
    }
}

/// reqwest-backed [`Network`].
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Network for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError> {
        let mut builder = self.http.request(request.method.clone(), request.url.as_str());
        if request.cache_mode == CacheMode::Reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| FetchError::Body(e.to_string()))?;

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            "fetched"
        );

        Ok(Response::new(status.as_u16(), status.canonical_reason().unwrap_or(""), headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "pagekeeper/0.1");
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_worker_config() {
        let worker = pagekeeper_core::WorkerConfig { user_agent: "site-sw/2".into(), ..Default::default() };
        let config = FetchConfig::from(&worker);
        assert_eq!(config.user_agent, "site-sw/2");
    }

    #[test]
    fn test_fetch_request_bypass() {
        let url = ::url::Url::parse("https://example.com/429/").unwrap();
        let request = FetchRequest::get(url.clone()).bypass_cache();
        assert_eq!(request.cache_mode, CacheMode::Reload);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, url);
    }

    #[test]
    fn test_fetch_request_from_intercepted() {
        let url = ::url::Url::parse("https://example.com/blog/").unwrap();
        let intercepted = pagekeeper_core::Request::navigate(url.clone());
        let request = FetchRequest::from(&intercepted);
        assert_eq!(request.url, url);
        assert_eq!(request.cache_mode, CacheMode::Default);
    }

    #[tokio::test]
    async fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(FetchConfig::default());
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_refused_connection_is_offline() {
        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let request = FetchRequest::get(::url::Url::parse("http://127.0.0.1:1/site.css").unwrap());

        let result = fetcher.fetch(&request).await;
        assert!(matches!(result, Err(FetchError::Offline(_))), "got {result:?}");
    }
}
