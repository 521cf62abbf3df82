//! The worker's view of the pages it controls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identifier of an open page (tab or window) under this controller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Messages posted to controlled pages.
///
/// Pages listen for `{"type":"RELOAD_PAGE"}` and reload themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "RELOAD_PAGE")]
    ReloadPage,
}

/// Errors reported by the hosting scope.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// The client went away before the message could be delivered.
    #[error("client {0} is no longer available")]
    ClientGone(ClientId),

    /// The host refused or failed the operation.
    #[error("scope operation failed: {0}")]
    Unavailable(String),
}

/// Platform services the controller relies on besides cache and network.
#[async_trait]
pub trait WorkerScope: Send + Sync {
    /// Pages currently controlled by this worker.
    async fn match_clients(&self) -> Vec<ClientId>;

    async fn post_message(&self, client: &ClientId, message: Message) -> Result<(), ScopeError>;

    /// Take control of already-open pages without waiting for a reload.
    async fn claim(&self) -> Result<(), ScopeError>;

    /// Activate as soon as install finishes instead of waiting for old pages to close.
    async fn skip_waiting(&self) -> Result<(), ScopeError>;
}
