// src/server/mod.rs

//! Preview HTTP server and live reload.
//!
//! The server is an explicit handle: `serve` starts it after the initial
//! development run and stops it on shutdown. Browsers connect to an SSE
//! endpoint and receive [`ReloadSignal`]s forwarded by the runtime.

pub mod livereload;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::config::ServerSection;
use crate::errors::Result;

pub use livereload::{LiveReload, ReloadSignal};

pub const EVENTS_PATH: &str = "/__assetpipe/events";
pub const CLIENT_PATH: &str = "/__assetpipe/livereload.js";

const CLIENT_JS: &str = include_str!("client.js");

#[derive(Clone)]
struct ServerState {
    files: ServeDir,
    live_reload: LiveReload,
    closing: watch::Receiver<bool>,
}

/// Handle to a running preview server.
#[derive(Debug)]
pub struct PreviewServer {
    addr: SocketAddr,
    closing: watch::Sender<bool>,
    task: JoinHandle<std::io::Result<()>>,
}

impl PreviewServer {
    /// Bind `server.host:server.port` and serve `root`.
    pub async fn start(
        server: &ServerSection,
        root: impl AsRef<Path>,
        live_reload: LiveReload,
    ) -> Result<Self> {
        let root: PathBuf = root.as_ref().to_path_buf();
        let listener = TcpListener::bind((server.host.as_str(), server.port))
            .await
            .with_context(|| format!("failed to bind {}:{}", server.host, server.port))?;
        let addr = listener.local_addr()?;

        let (closing_tx, closing_rx) = watch::channel(false);
        let state = ServerState {
            files: ServeDir::new(&root),
            live_reload,
            closing: closing_rx.clone(),
        };
        let app = router(state);

        let mut shutdown = closing_rx;
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.wait_for(|closing| *closing).await;
                })
                .await
        });

        info!(url = %format!("http://{addr}/"), root = ?root, "preview server started");
        Ok(Self {
            addr,
            closing: closing_tx,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Close event streams, stop accepting connections and wait for the
    /// server task to finish.
    pub async fn stop(self) -> Result<()> {
        let _ = self.closing.send(true);
        match self.task.await {
            Ok(res) => res?,
            Err(err) => warn!(error = %err, "preview server task did not finish cleanly"),
        }
        info!("preview server stopped");
        Ok(())
    }
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(events))
        .route(CLIENT_PATH, get(client_script))
        .fallback(serve_output)
        .with_state(state)
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}

/// Server-sent events stream. Ends when the server starts shutting down so
/// graceful shutdown does not wait on open browser tabs.
async fn events(State(state): State<ServerState>) -> impl IntoResponse {
    debug!("browser connected to live reload");

    let signals = BroadcastStream::new(state.live_reload.subscribe())
        .filter_map(|signal| signal.ok())
        .map(|signal| Some(signal_event(&signal)));
    let closing = WatchStream::new(state.closing.clone())
        .filter(|closing| *closing)
        .map(|_| None);

    let stream = signals
        .merge(closing)
        .take_while(|event| event.is_some())
        .filter_map(|event| event.map(Ok::<_, Infallible>));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn signal_event(signal: &ReloadSignal) -> Event {
    let data = serde_json::to_string(signal.paths()).unwrap_or_else(|_| "[]".to_string());
    Event::default().event(signal.event_name()).data(data)
}

/// Static files from the output root; HTML pages get the client script.
async fn serve_output(State(state): State<ServerState>, req: Request) -> Response {
    let res = match state.files.clone().oneshot(req).await {
        Ok(res) => res.map(Body::new),
        Err(never) => match never {},
    };

    if res.status() != StatusCode::OK || !is_html(&res) {
        return res;
    }

    let (mut parts, body) = res.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to read page for live reload injection");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let page = inject_client(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Response::from_parts(parts, Body::from(page))
}

fn is_html(res: &Response) -> bool {
    res.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}

/// Insert the client `<script>` before the closing body tag, or append it.
pub fn inject_client(page: &str) -> String {
    let tag = format!("<script src=\"{CLIENT_PATH}\"></script>");
    match page.to_ascii_lowercase().rfind("</body>") {
        Some(at) => format!("{}{tag}\n{}", &page[..at], &page[at..]),
        None => format!("{page}\n{tag}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body() {
        let page = inject_client("<html><body><p>hi</p></BODY></html>");
        assert_eq!(
            page,
            "<html><body><p>hi</p><script src=\"/__assetpipe/livereload.js\"></script>\n</BODY></html>"
        );
    }

    #[test]
    fn fragments_get_the_script_appended() {
        let page = inject_client("<p>fragment</p>");
        assert!(page.starts_with("<p>fragment</p>\n<script"));
        assert!(page.ends_with("</script>\n"));
    }
}
