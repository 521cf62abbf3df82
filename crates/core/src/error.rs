//! Unified error types for pagekeeper.
//!
//! Every variant renders with a stable code prefix so the host protocol can
//! report failures without matching on message text.

use tokio_rusqlite::rusqlite;

/// Unified error type for the cache controller and its storage backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (e.g., a malformed request from the host).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A precache fetch returned a non-success status during install.
    #[error("INSTALL_FAILED: {url} returned status {status}")]
    InstallFailed { url: String, status: u16 },

    /// The network rejected a request outright (offline, DNS, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded back into a response.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Stable code prefix for this error, as reported by the host.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InstallFailed { .. } => "INSTALL_FAILED",
            Error::Network(_) => "NETWORK_ERROR",
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => "CACHE_ERROR",
            Error::InvalidUrl(_) => "INVALID_URL",
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InstallFailed { url: "https://example.com/favicon.ico".to_string(), status: 404 };
        assert!(err.to_string().starts_with("INSTALL_FAILED"));
        assert!(err.to_string().contains("favicon.ico"));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_error_code_matches_display_prefix() {
        let errors = [
            Error::InvalidInput("x".into()),
            Error::InstallFailed { url: "u".into(), status: 500 },
            Error::Network("offline".into()),
            Error::MigrationFailed("bad".into()),
            Error::CorruptEntry("headers".into()),
            Error::InvalidUrl("::".into()),
        ];
        for err in errors {
            assert!(err.to_string().starts_with(err.code()), "{err}");
        }
    }

    #[test]
    fn test_url_parse_error_maps_to_invalid_url() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.code(), "INVALID_URL");
    }
}
