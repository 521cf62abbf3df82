//! Service-worker cache controller.
//!
//! [`CacheController`] owns one cache generation and decides, per
//! intercepted request, whether to go network-first (navigations),
//! stale-while-revalidate (static assets and stylesheets), or straight to the
//! network (everything else). When a cached asset changes underneath an open
//! page, every controlled page is asked to reload.

mod assets;
pub mod controller;
pub mod host;
pub mod lifecycle;
mod navigation;
pub mod rate_limit;
pub mod reload;
pub mod route;
pub mod scope;

#[cfg(test)]
mod testing;

pub use controller::{CacheController, FetchOutcome};
pub use host::{HostEvent, HostOutput, StdioScope};
pub use lifecycle::{ActivateReport, InstallReport};
pub use reload::ReloadCoordinator;
pub use route::{RouteKind, classify};
pub use scope::{ClientId, Message, ScopeError, WorkerScope};
