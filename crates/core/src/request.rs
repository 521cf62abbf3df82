//! Intercepted request shape.

use http::Method;
use url::Url;

/// How the page issued the request.
///
/// Only [`RequestMode::Navigate`] changes routing; the remaining modes are
/// carried so the host can describe sub-resource requests faithfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    #[default]
    NoCors,
    Cors,
    SameOrigin,
}

/// A request intercepted from a controlled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
}

impl Request {
    /// A document navigation to `url`.
    pub fn navigate(url: Url) -> Self {
        Self { method: Method::GET, url, mode: RequestMode::Navigate }
    }

    /// A plain GET sub-resource request.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, mode: RequestMode::NoCors }
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let url = Url::parse("https://example.com/blog/").unwrap();
        let nav = Request::navigate(url.clone());
        assert!(nav.is_navigation());
        assert_eq!(nav.method, Method::GET);

        let asset = Request::get(url);
        assert!(!asset.is_navigation());
        assert_eq!(asset.mode, RequestMode::NoCors);
    }
}
