//! Rewrites a rate-limited navigation into the cached 429 page.
//!
//! The fallback page gets the `Retry-After` value injected as a global right
//! after its first `<script>` tag, so it can render a countdown without a
//! second request.

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, RETRY_AFTER};
use http::HeaderValue;
use pagekeeper_core::Response;

pub const RATE_LIMITED_STATUS: u16 = 429;
pub const RATE_LIMITED_STATUS_TEXT: &str = "Too Many Requests";

const SCRIPT_TAG: &[u8] = b"<script>";

/// Insert `window.<global> = <retry_after as JSON>;` after the first `<script>`.
///
/// Bodies without a `<script>` tag are returned unchanged.
pub fn inject_retry_after(body: &[u8], global: &str, retry_after: Option<&str>) -> Bytes {
    let Some(pos) = body.windows(SCRIPT_TAG.len()).position(|w| w == SCRIPT_TAG) else {
        return Bytes::copy_from_slice(body);
    };
    let split = pos + SCRIPT_TAG.len();

    let value = match retry_after {
        Some(v) => serde_json::Value::from(v).to_string(),
        None => "null".to_string(),
    };
    let line = format!("\nwindow.{global} = {value};");

    let mut out = BytesMut::with_capacity(body.len() + line.len());
    out.put_slice(&body[..split]);
    out.put_slice(line.as_bytes());
    out.put_slice(&body[split..]);
    out.freeze()
}

/// Build the 429 response served in place of `original`.
pub fn reshape(original: &Response, fallback: &Response, global: &str) -> Response {
    let retry_after = original.headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok());
    let body = inject_retry_after(&fallback.body, global, retry_after);

    let mut headers = fallback.headers.clone();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
    headers.remove(CONTENT_LENGTH);

    Response::new(RATE_LIMITED_STATUS, RATE_LIMITED_STATUS_TEXT, headers, body)
}
