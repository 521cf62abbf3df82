//! In-crate fakes for network and scope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, header};
use pagekeeper_client::{FetchError, FetchRequest, Network};
use pagekeeper_core::{CacheStorage, MemoryCacheStorage, Response, WorkerConfig};
use tokio::sync::Notify;

use crate::CacheController;
use crate::scope::{ClientId, Message, ScopeError, WorkerScope};

pub const ORIGIN: &str = "https://example.com";

pub fn url(path: &str) -> url::Url {
    url::Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn key(path: &str) -> String {
    url(path).to_string()
}

pub fn html(status: u16, body: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    Response::new(status, "", headers, body)
}

pub fn css(body: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
    Response::new(200, "OK", headers, body)
}

pub fn config() -> WorkerConfig {
    WorkerConfig { origin: ORIGIN.into(), ..Default::default() }
}

#[derive(Clone)]
enum Route {
    Respond(Response),
    Fail,
    Gated { response: Response, gate: Arc<Notify> },
}

/// Network fake keyed by URL path. Unknown paths fail as if offline.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, response: Response) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::Respond(response));
    }

    pub fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::Fail);
    }

    /// Respond only after the returned gate is notified.
    pub fn gate(&self, path: &str, response: Response) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Route::Gated { response, gate: gate.clone() });
        gate
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        let route = self.routes.lock().unwrap().get(request.url.path()).cloned();
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Gated { response, gate }) => {
                gate.notified().await;
                Ok(response)
            }
            Some(Route::Fail) | None => Err(FetchError::Offline(request.url.to_string())),
        }
    }
}

/// Scope fake that records every message and lifecycle signal.
#[derive(Default)]
pub struct MockScope {
    clients: Vec<ClientId>,
    messages: Mutex<Vec<(ClientId, Message)>>,
    pub claimed: AtomicBool,
    pub skipped_waiting: AtomicBool,
    pub fail_claim: AtomicBool,
}

impl MockScope {
    pub fn with_clients(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self { clients: ids.iter().map(|id| ClientId::new(*id)).collect(), ..Default::default() })
    }

    pub fn messages(&self) -> Vec<(ClientId, Message)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkerScope for MockScope {
    async fn match_clients(&self) -> Vec<ClientId> {
        self.clients.clone()
    }

    async fn post_message(&self, client: &ClientId, message: Message) -> Result<(), ScopeError> {
        self.messages.lock().unwrap().push((client.clone(), message));
        Ok(())
    }

    async fn claim(&self) -> Result<(), ScopeError> {
        if self.fail_claim.load(Ordering::SeqCst) {
            return Err(ScopeError::Unavailable("claim refused".into()));
        }
        self.claimed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn skip_waiting(&self) -> Result<(), ScopeError> {
        self.skipped_waiting.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Controller wired to fakes, plus handles on each fake.
pub struct Harness {
    pub controller: CacheController,
    pub storage: Arc<MemoryCacheStorage>,
    pub network: Arc<MockNetwork>,
    pub scope: Arc<MockScope>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: WorkerConfig) -> Self {
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = MockNetwork::new();
        let scope = MockScope::with_clients(&["tab-1", "tab-2"]);
        let controller = CacheController::new(config, storage.clone(), network.clone(), scope.clone()).unwrap();
        Self { controller, storage, network, scope }
    }

    pub fn cache_name(&self) -> String {
        self.controller.config().cache_name()
    }

    pub async fn seed(&self, path: &str, response: &Response) {
        self.storage.put(&self.cache_name(), &key(path), response).await.unwrap();
    }

    pub async fn cached(&self, path: &str) -> Option<Response> {
        self.storage.match_url(&self.cache_name(), &key(path)).await.unwrap()
    }
}
