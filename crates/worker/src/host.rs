//! Line-delimited JSON host over stdio.
//!
//! Each stdin line is one event from the embedding platform; each stdout line
//! is one record back. Page messages and lifecycle signals raised by the
//! controller go out on the same stream, in the order they happen.
//!
//! ### Events
//! - `{"event":"connect","client":"tab-1"}` / `{"event":"disconnect","client":"tab-1"}`
//! - `{"event":"install"}` / `{"event":"activate"}`
//! - `{"event":"fetch","url":"/site.css","navigate":false,"method":"GET"}`
//!
//! Install and activate are handled one at a time in arrival order. Fetches
//! run concurrently; on end of input the host waits for every fetch and its
//! background work before returning.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use http::header::CONTENT_TYPE;
use pagekeeper_core::{Error, Request, RequestMode, Response};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use crate::controller::CacheController;
use crate::lifecycle::{ActivateReport, InstallReport};
use crate::scope::{ClientId, Message, ScopeError, WorkerScope};

/// Inbound platform event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Connect {
        client: ClientId,
    },
    Disconnect {
        client: ClientId,
    },
    Install,
    Activate,
    Fetch {
        url: String,
        #[serde(default)]
        navigate: bool,
        #[serde(default = "default_method")]
        method: String,
    },
}

fn default_method() -> String {
    "GET".into()
}

/// Outbound record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostOutput {
    Installed(InstallReport),
    InstallFailed {
        code: &'static str,
        message: String,
    },
    Activated(ActivateReport),
    Response {
        url: String,
        status: u16,
        status_text: String,
        bytes: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    Message {
        client: ClientId,
        message: Message,
    },
    Lifecycle {
        signal: &'static str,
    },
    Error {
        message: String,
    },
}

impl HostOutput {
    fn response(url: &str, response: &Response) -> Self {
        HostOutput::Response {
            url: url.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            bytes: response.body.len(),
            content_type: response.header(CONTENT_TYPE.as_str()).map(str::to_owned),
        }
    }
}

/// [`WorkerScope`] backed by the stdio stream.
///
/// Clients exist between their `connect` and `disconnect` events. Messages
/// and lifecycle signals are queued as [`HostOutput`] records.
pub struct StdioScope {
    clients: Mutex<BTreeSet<ClientId>>,
    outputs: mpsc::UnboundedSender<HostOutput>,
}

impl StdioScope {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<HostOutput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { clients: Mutex::new(BTreeSet::new()), outputs: tx }), rx)
    }

    pub async fn connect(&self, client: ClientId) {
        self.clients.lock().await.insert(client);
    }

    pub async fn disconnect(&self, client: &ClientId) {
        self.clients.lock().await.remove(client);
    }

    fn emit(&self, output: HostOutput) -> Result<(), ScopeError> {
        self.outputs
            .send(output)
            .map_err(|_| ScopeError::Unavailable("output stream closed".into()))
    }
}

#[async_trait]
impl WorkerScope for StdioScope {
    async fn match_clients(&self) -> Vec<ClientId> {
        self.clients.lock().await.iter().cloned().collect()
    }

    async fn post_message(&self, client: &ClientId, message: Message) -> Result<(), ScopeError> {
        if !self.clients.lock().await.contains(client) {
            return Err(ScopeError::ClientGone(client.clone()));
        }
        self.emit(HostOutput::Message { client: client.clone(), message })
    }

    async fn claim(&self) -> Result<(), ScopeError> {
        self.emit(HostOutput::Lifecycle { signal: "claim" })
    }

    async fn skip_waiting(&self) -> Result<(), ScopeError> {
        self.emit(HostOutput::Lifecycle { signal: "skip_waiting" })
    }
}

/// Drive `controller` from `reader` until end of input, writing records to `writer`.
pub async fn run<R, W>(
    controller: CacheController, scope: Arc<StdioScope>, mut outputs: mpsc::UnboundedReceiver<HostOutput>, reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<HostEvent>(&line) {
                    Ok(event) => dispatch(&controller, &scope, event, &mut tasks).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "unparsable host event");
                        if let Err(e) = scope.emit(HostOutput::Error { message: format!("INVALID_INPUT: {e}") }) {
                            tracing::warn!(error = %e, "failed to queue host output");
                        }
                    }
                }
            }
            Some(output) = outputs.recv() => write_record(&mut writer, &output).await?,
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => log_join(joined),
        }
    }

    tracing::debug!(in_flight = tasks.len(), "input closed; waiting for in-flight fetches");
    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }
    while let Ok(output) = outputs.try_recv() {
        write_record(&mut writer, &output).await?;
    }
    writer.flush().await
}

async fn dispatch(
    controller: &CacheController, scope: &Arc<StdioScope>, event: HostEvent, tasks: &mut JoinSet<()>,
) {
    let emitted = match event {
        HostEvent::Connect { client } => {
            scope.connect(client).await;
            Ok(())
        }
        HostEvent::Disconnect { client } => {
            scope.disconnect(&client).await;
            Ok(())
        }
        HostEvent::Install => match controller.install().await {
            Ok(report) => scope.emit(HostOutput::Installed(report)),
            Err(e) => {
                tracing::warn!(error = %e, "install failed");
                scope.emit(HostOutput::InstallFailed { code: e.code(), message: e.to_string() })
            }
        },
        HostEvent::Activate => scope.emit(HostOutput::Activated(controller.activate().await)),
        HostEvent::Fetch { url, navigate, method } => match build_request(controller, &url, navigate, &method) {
            Ok(request) => {
                let controller = controller.clone();
                let scope = scope.clone();
                tasks.spawn(async move {
                    let mut outcome = controller.handle_fetch(request).await;
                    if let Err(e) = scope.emit(HostOutput::response(&url, &outcome.response)) {
                        tracing::warn!(error = %e, "dropped fetch response record");
                    }
                    outcome.wait_until().await;
                });
                Ok(())
            }
            Err(e) => scope.emit(HostOutput::Error { message: e.to_string() }),
        },
    };

    if let Err(e) = emitted {
        tracing::warn!(error = %e, "failed to queue host output");
    }
}

fn build_request(controller: &CacheController, url: &str, navigate: bool, method: &str) -> Result<Request, Error> {
    let url = controller.resolve(url)?;
    let method = Method::from_bytes(method.as_bytes()).map_err(|e| Error::InvalidInput(format!("method: {e}")))?;
    let mode = if navigate { RequestMode::Navigate } else { RequestMode::NoCors };
    Ok(Request { method, url, mode })
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::warn!(error = %e, "fetch task aborted");
    }
}

async fn write_record<W: AsyncWrite + Unpin>(writer: &mut W, output: &HostOutput) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(output).map_err(std::io::Error::other)?;
    line.push(b'\n');
    writer.write_all(&line).await
}
