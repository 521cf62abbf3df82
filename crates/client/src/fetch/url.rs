//! URL helpers for cache keys and cache-busting fetches.

use url::Url;

/// Query parameter appended to force a fresh network round trip.
pub const CACHE_BUST_PARAM: &str = "_cb";

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a path or absolute URL against the site origin.
///
/// 1. Trim leading/trailing whitespace
/// 2. Join relative input onto `origin`
/// 3. Reject non-http(s) schemes
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Cache key for a request URL: the URL without its fragment.
pub fn cache_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

/// Copy of `url` with a cache-busting timestamp appended to its query.
pub fn cache_bust(url: &Url, stamp_ms: i64) -> Url {
    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair(CACHE_BUST_PARAM, &stamp_ms.to_string());
    busted
}

/// True if the URL path ends with the given stylesheet extension.
pub fn is_stylesheet(url: &Url, extension: &str) -> bool {
    url.path().ends_with(extension)
}
