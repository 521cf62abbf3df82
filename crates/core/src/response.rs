//! Response type shared by the network layer and cache storage.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};

/// Status code used for the synthetic "offline" sentinel.
///
/// 599 sits outside the registered range so pages can tell it apart from
/// anything a real server sends.
pub const OFFLINE_STATUS: u16 = 599;

/// Status phrase of the offline sentinel.
pub const OFFLINE_STATUS_TEXT: &str = "offline";

/// An HTTP response as seen by the controller.
///
/// Network responses and cache entries use the same shape; a stored entry is
/// just a response that was written under a URL key.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, status_text: impl Into<String>, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: status_text.into(), headers, body: body.into() }
    }

    /// The synthetic 599 response returned when the network is unreachable.
    pub fn offline() -> Self {
        Self::new(OFFLINE_STATUS, OFFLINE_STATUS_TEXT, HeaderMap::new(), Bytes::new())
    }

    /// True for statuses in the 200..=299 range.
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn is_offline_sentinel(&self) -> bool {
        self.status == OFFLINE_STATUS && self.status_text == OFFLINE_STATUS_TEXT
    }

    /// Header value as a string, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Copy of this response with one extra header set.
    pub fn with_header(&self, name: HeaderName, value: HeaderValue) -> Self {
        let mut headers = self.headers.clone();
        headers.insert(name, value);
        Self { headers, ..self.clone() }
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
