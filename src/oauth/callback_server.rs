//! Usage: Localhost callback listener for the authorization code redirect.
//!
//! The listener owns its sockets and server task. The first request carrying `code` or
//! `error` is captured into a write-once slot; later requests are answered but ignored.
//! `shutdown()` (or dropping the listener) closes the sockets.

use crate::oauth::authorize::CALLBACK_PATH;
use crate::shared::error::{AppError, AppResult, BIND_ERROR};
use crate::shared::security::escape_html;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_HTML: &str = "<html><head><title>OAuth Success</title></head>\
<body style=\"font-family: Arial; text-align: center; padding: 50px;\">\
<h1 style=\"color: green;\">OAuth Success</h1>\
<p>Authorization received. You can close this tab.</p>\
<p>Check your console for token information.</p></body></html>";

const UNKNOWN_CALLBACK_HTML: &str = "<html><head><title>OAuth Callback</title></head>\
<body style=\"font-family: Arial; text-align: center; padding: 50px;\">\
<h1>Unrecognised callback</h1><p>Expected a code or an error parameter.</p></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    Code {
        code: String,
        state: Option<String>,
    },
    Error {
        error: String,
        description: Option<String>,
    },
}

/// Write-once result slot shared between the server task and the poller.
#[derive(Debug, Default)]
pub struct CallbackSlot {
    value: OnceLock<CallbackPayload>,
}

impl CallbackSlot {
    /// Returns `false` when a result was already captured; the stored value is kept.
    pub fn store(&self, payload: CallbackPayload) -> bool {
        self.value.set(payload).is_ok()
    }

    pub fn get(&self) -> Option<&CallbackPayload> {
        self.value.get()
    }
}

/// Classifies the query pairs of a callback request. The first occurrence of a key wins and
/// blank values count as absent.
pub(crate) fn classify_callback<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Option<CallbackPayload> {
    let mut code: Option<&str> = None;
    let mut state: Option<&str> = None;
    let mut error: Option<&str> = None;
    let mut error_description: Option<&str> = None;

    for (key, value) in pairs {
        if value.is_empty() {
            continue;
        }
        let slot = match key {
            "code" => &mut code,
            "state" => &mut state,
            "error" => &mut error,
            "error_description" => &mut error_description,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    if let Some(code) = code {
        return Some(CallbackPayload::Code {
            code: code.to_string(),
            state: state.map(str::to_string),
        });
    }
    error.map(|error| CallbackPayload::Error {
        error: error.to_string(),
        description: error_description.map(str::to_string),
    })
}

fn render_page(payload: &CallbackPayload) -> (StatusCode, String) {
    match payload {
        CallbackPayload::Code { .. } => (StatusCode::OK, SUCCESS_HTML.to_string()),
        CallbackPayload::Error { error, description } => {
            let body = format!(
                "<html><head><title>OAuth Error</title></head>\
<body style=\"font-family: Arial; text-align: center; padding: 50px;\">\
<h1 style=\"color: red;\">OAuth Error</h1>\
<p>Error: {}</p><p>Description: {}</p>\
<p>Check your console for details.</p></body></html>",
                escape_html(error),
                escape_html(description.as_deref().unwrap_or_default()),
            );
            (StatusCode::BAD_REQUEST, body)
        }
    }
}

async fn handle_callback(
    State(slot): State<Arc<CallbackSlot>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let Some(payload) = classify_callback(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    else {
        tracing::debug!("callback request without code or error");
        return (StatusCode::BAD_REQUEST, Html(UNKNOWN_CALLBACK_HTML)).into_response();
    };

    let (status, page) = render_page(&payload);
    if slot.store(payload) {
        tracing::info!(status = status.as_u16(), "oauth callback captured");
    } else {
        tracing::debug!("oauth callback ignored: a result was already captured");
    }
    (status, Html(page)).into_response()
}

pub(crate) fn build_router(slot: Arc<CallbackSlot>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .with_state(slot)
}

#[derive(Debug)]
struct BoundSockets {
    port: u16,
    listeners: Vec<TcpListener>,
}

/// IPv4 loopback is required; IPv6 loopback on the same port is best-effort so that
/// `localhost` resolving to `::1` still reaches us.
async fn bind_loopback(port: u16) -> AppResult<BoundSockets> {
    let listener_v4 = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|err| {
            let message = if err.kind() == std::io::ErrorKind::AddrInUse {
                format!("port {port} is already in use; try --port <other_port>")
            } else {
                format!("failed to bind 127.0.0.1:{port}: {err}")
            };
            AppError::new(BIND_ERROR, message).with_source(err)
        })?;
    let port = listener_v4
        .local_addr()
        .map_err(|e| AppError::new(BIND_ERROR, format!("127.0.0.1:{port} (local_addr failed: {e})")))?
        .port();

    let mut listeners = vec![listener_v4];
    match TcpListener::bind(("::1", port)).await {
        Ok(listener) => listeners.push(listener),
        Err(err) => tracing::debug!(port, "ipv6 loopback bind skipped: {}", err),
    }

    Ok(BoundSockets { port, listeners })
}

#[derive(Debug)]
pub struct CallbackListener {
    port: u16,
    slot: Arc<CallbackSlot>,
    shutdown_tx: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

impl CallbackListener {
    /// Binds the callback port (0 picks a free one) and starts serving in the background.
    pub async fn start(port: u16) -> AppResult<Self> {
        let bound = bind_loopback(port).await?;
        let slot = Arc::new(CallbackSlot::default());
        let router = build_router(slot.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = bound
            .listeners
            .into_iter()
            .map(|listener| spawn_server(listener, router.clone(), shutdown_rx.clone()))
            .collect();

        tracing::info!(port = bound.port, "oauth callback listener started");
        Ok(Self {
            port: bound.port,
            slot,
            shutdown_tx: Some(shutdown_tx),
            tasks,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn slot(&self) -> Arc<CallbackSlot> {
        self.slot.clone()
    }

    /// Stops accepting, closes the sockets and joins the server task(s).
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        for mut task in self.tasks.drain(..) {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!("callback server task failed: {}", err),
                Err(_) => {
                    tracing::warn!("callback server did not drain in time; aborting");
                    task.abort();
                    let _ = task.await;
                }
            }
        }
        tracing::info!(port = self.port, "oauth callback listener stopped");
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn spawn_server(
    listener: TcpListener,
    router: Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let addr = listener.local_addr().ok();
        let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
        });
        if let Err(err) = serve.await {
            tracing::error!(addr = ?addr, "callback server error: {}", err);
        }
    })
}
