//! Renderer dev server.
//!
//! Serves the renderer bundle from memory, injects a small reload client
//! into HTML pages and pushes `{"type":"full-reload"}` over Server-Sent
//! Events whenever the bundle changes or the preload script was rebuilt.

use std::collections::HashMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use fob_electron_config::{HostOption, ServerOptions};
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};

use super::DevServer;
use super::html::inject_script;
use super::output::OutputFile;
use crate::error::{Error, Result};

const SSE_PATH: &str = "/__fob_electron_sse__";
const CLIENT_PATH: &str = "/__fob_electron_client__.js";
const DEFAULT_PORT: u16 = 5173;
/// How many ports above the configured one are tried before giving up.
const PORT_ATTEMPTS: u16 = 20;

const RELOAD_CLIENT: &str = r#"const source = new EventSource("/__fob_electron_sse__");
source.onmessage = (event) => {
  const payload = JSON.parse(event.data);
  if (payload.type === "full-reload") {
    location.reload();
  }
};
"#;

const FULL_RELOAD: &str = r#"{"type":"full-reload"}"#;

/// Host to bind and host to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    pub bind: String,
    pub name: String,
}

/// Wildcard and unset hosts are shown as `localhost`.
pub fn resolve_hostname(host: Option<&HostOption>) -> ResolvedHost {
    let bind = match host {
        None | Some(HostOption::All(false)) => "localhost".to_string(),
        Some(HostOption::All(true)) => "0.0.0.0".to_string(),
        Some(HostOption::Address(address)) => address.clone(),
    };
    let name = match bind.as_str() {
        "0.0.0.0" | "::" | "0000:0000:0000:0000:0000:0000:0000:0000" | "127.0.0.1" => {
            "localhost".to_string()
        }
        other => other.to_string(),
    };
    ResolvedHost { bind, name }
}

/// Files served by the dev server and the clients listening for reloads.
#[derive(Debug, Default)]
pub struct ServerState {
    files: RwLock<HashMap<String, Vec<u8>>>,
    error: RwLock<Option<String>>,
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_client_id: AtomicUsize,
    public_dir: Option<PathBuf>,
}

impl ServerState {
    pub fn new(public_dir: Option<PathBuf>) -> Self {
        Self {
            public_dir,
            ..Default::default()
        }
    }

    /// Replace the served bundle.
    pub fn set_files(&self, files: &[OutputFile]) {
        let files = files
            .iter()
            .map(|file| (format!("/{}", file.file_name()), file.contents().to_vec()))
            .collect();
        *self.files.write() = files;
        *self.error.write() = None;
    }

    pub fn set_error(&self, error: String) {
        *self.error.write() = Some(error);
    }

    fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.read().get(path).cloned()
    }

    fn register_client(&self) -> mpsc::Receiver<String> {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(16);
        self.clients.write().insert(id, tx);
        tracing::debug!(client = id, "reload client connected");
        rx
    }

    /// Tell every connected page to reload, dropping closed connections.
    pub async fn broadcast_reload(&self) {
        let clients: Vec<(usize, mpsc::Sender<String>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut closed = Vec::new();
        for (id, tx) in clients {
            if tx.send(FULL_RELOAD.to_string()).await.is_err() {
                closed.push(id);
            }
        }

        let mut registry = self.clients.write();
        for id in closed {
            registry.remove(&id);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

pub type SharedState = Arc<ServerState>;

/// The axum-based renderer server.
pub struct RendererServer {
    url: String,
    state: SharedState,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
    rebuild: Option<JoinHandle<()>>,
}

impl RendererServer {
    /// Bind according to `options` and start serving `state`.
    pub async fn start(options: Option<&ServerOptions>, state: SharedState) -> Result<Self> {
        let host = resolve_hostname(options.and_then(|o| o.host.as_ref()));
        let port = options.and_then(|o| o.port).unwrap_or(DEFAULT_PORT);
        let strict = options.and_then(|o| o.strict_port).unwrap_or(false);

        let listener = bind(&host.bind, port, strict).await?;
        let local = listener
            .local_addr()
            .map_err(|e| Error::Server(format!("Failed to read server address: {e}")))?;
        let url = format!("http://{}:{}/", host.name, local.port());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!("dev server error: {e}");
            }
        });

        tracing::debug!(%url, "renderer dev server listening");
        Ok(Self {
            url,
            state,
            shutdown: Some(shutdown_tx),
            server,
            rebuild: None,
        })
    }

    /// Keep `task` alive for as long as the server runs.
    pub fn with_rebuild_task(mut self, task: JoinHandle<()>) -> Self {
        self.rebuild = Some(task);
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }
}

#[async_trait]
impl DevServer for RendererServer {
    fn url(&self) -> &str {
        &self.url
    }

    async fn full_reload(&self) {
        self.state.broadcast_reload().await;
    }

    async fn close(mut self: Box<Self>) {
        if let Some(task) = self.rebuild.take() {
            task.abort();
        }
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = (&mut self.server).await;
    }
}

async fn bind(host: &str, port: u16, strict: bool) -> Result<TcpListener> {
    let attempts = if strict { 1 } else { PORT_ATTEMPTS };
    let mut last_error = None;

    for offset in 0..attempts {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => {
                if offset > 0 {
                    tracing::info!("Port {port} is in use, trying another one...");
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => last_error = Some(e),
            Err(e) => {
                return Err(Error::Server(format!(
                    "Failed to bind to {host}:{candidate}: {e}"
                )));
            }
        }
    }

    match last_error {
        Some(_) if strict => Err(Error::Server(format!("Port {port} is already in use"))),
        Some(e) => Err(Error::Server(format!("No free port found from {port}: {e}"))),
        None => Err(Error::Server(format!("Invalid port {port}"))),
    }
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route(SSE_PATH, get(handle_sse))
        .route(CLIENT_PATH, get(handle_client))
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn handle_sse(
    State(state): State<SharedState>,
) -> Sse<impl tokio_stream::Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.register_client();
    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn handle_client() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_CLIENT,
    )
}

async fn handle_request(State(state): State<SharedState>, uri: Uri) -> Response {
    let path = match uri.path() {
        "/" => "/index.html",
        other => other,
    };
    let content_type = content_type(path);

    if content_type.starts_with("text/html") {
        if let Some(error) = state.error.read().clone() {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                error,
            )
                .into_response();
        }
    }

    if let Some(content) = state.file(path) {
        let body = if content_type.starts_with("text/html") {
            let html = String::from_utf8_lossy(&content);
            inject_script(&html, &format!(r#"<script type="module" src="{CLIENT_PATH}"></script>"#))
                .into_bytes()
        } else {
            content
        };
        return (
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response();
    }

    if let Some(public_dir) = &state.public_dir {
        let relative = path.trim_start_matches('/');
        let file = path_clean::clean(public_dir.join(relative));
        if file.starts_with(public_dir) && file.is_file() {
            match tokio::fs::read(&file).await {
                Ok(content) => {
                    return ([(header::CONTENT_TYPE, content_type)], content).into_response();
                }
                Err(e) => tracing::warn!("Failed to read {}: {e}", file.display()),
            }
        }
    }

    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        format!("File not found: {path}"),
    )
        .into_response()
}

fn content_type(path: &str) -> &'static str {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "html" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "json" | "map" => "application/json",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

impl std::fmt::Debug for RendererServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererServer").field("url", &self.url).finish()
    }
}

/// Address the server listens on, for tests.
#[cfg(test)]
fn socket_of(url: &str) -> std::net::SocketAddr {
    let authority = url
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .replace("localhost", "127.0.0.1");
    authority.parse().unwrap()
}
