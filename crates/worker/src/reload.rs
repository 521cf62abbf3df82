//! One-shot reload broadcast to controlled pages.
//!
//! The latch is set while a broadcast is being dispatched and cleared again
//! right after, in the same synchronous step. It only suppresses a trigger
//! that arrives while another trigger is still inside `request_reload`;
//! separate events each get their own broadcast.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

use crate::scope::{Message, WorkerScope};

/// Sends `RELOAD_PAGE` to every controlled page.
pub struct ReloadCoordinator {
    in_flight: AtomicBool,
    scope: Arc<dyn WorkerScope>,
}

impl ReloadCoordinator {
    pub fn new(scope: Arc<dyn WorkerScope>) -> Self {
        Self { in_flight: AtomicBool::new(false), scope }
    }

    /// Whether a broadcast is currently being dispatched.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Ask every controlled page to reload.
    ///
    /// Returns `None` if a broadcast is already being dispatched. Otherwise the
    /// broadcast runs on its own task; await the handle to keep the calling
    /// event alive until every page has been messaged; it yields the number
    /// of pages the message was delivered to. Must be called from within a
    /// tokio runtime.
    pub fn request_reload(&self) -> Option<JoinHandle<usize>> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("reload broadcast already in flight");
            return None;
        }

        let scope = self.scope.clone();
        let handle = tokio::spawn(async move {
            let clients = scope.match_clients().await;
            let mut delivered = 0usize;
            for client in &clients {
                match scope.post_message(client, Message::ReloadPage).await {
                    Ok(()) => delivered += 1,
                    Err(e) => tracing::warn!(%client, error = %e, "failed to post reload message"),
                }
            }
            tracing::info!(clients = clients.len(), delivered, "reload broadcast sent");
            delivered
        });

        self.in_flight.store(false, Ordering::Release);
        Some(handle)
    }
}
