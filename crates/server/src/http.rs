//! Bridge endpoints served to the receiver page
//!
//! - `POST /bridge/ready`   heartbeat
//! - `GET  /bridge/timeout` current heartbeat timeout
//! - `POST /bridge/log`     diagnostics from page scripts
//! - `GET  /status`         watchdog status

use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use dashkiosk_core::SignalBridge;
use dashkiosk_core::config::Config;
use dashkiosk_core::heartbeat::{WatchdogEvent, WatchdogState};

#[derive(Clone)]
struct AppState {
    bridge: SignalBridge,
}

pub struct Server {
    bind: String,
    port: u16,
    bridge: SignalBridge,
}

impl Server {
    pub fn new(config: &Config, bridge: SignalBridge) -> Self {
        Self {
            bind: config.server.bind.clone(),
            port: config.server.port,
            bridge,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = TcpListener::bind(self.addr()).await?;
        let local: SocketAddr = listener.local_addr()?;
        info!("bridge server listening on http://{}", local);

        axum::serve(listener, router(self.bridge))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("bridge server stopped");
        Ok(())
    }
}

/// Build the bridge router. CORS is open: the receiver is usually served
/// from a different origin than this local endpoint.
pub fn router(bridge: SignalBridge) -> Router {
    Router::new()
        .route("/bridge/ready", post(ready))
        .route("/bridge/timeout", get(timeout))
        .route("/bridge/log", post(log))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { bridge })
}

async fn ready(State(state): State<AppState>) -> Response {
    match state.bridge.ready() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn timeout(State(state): State<AppState>) -> Response {
    match state.bridge.timeout() {
        Ok(ms) => Json(json!({ "timeout_ms": ms })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct LogRequest {
    message: String,
}

async fn log(State(state): State<AppState>, Json(request): Json<LogRequest>) -> StatusCode {
    state.bridge.log(&request.message);
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct StatusResponse {
    state: WatchdogState,
    epoch: u64,
    /// Milliseconds until the pending deadline fires
    deadline_in_ms: Option<u64>,
    signals: u64,
    reloads: u64,
    stopped: bool,
    last_event: Option<WatchdogEvent>,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let monitor = state.bridge.monitor();
    let status = monitor.status();
    let now = Instant::now();

    Json(StatusResponse {
        state: status.state,
        epoch: status.epoch,
        deadline_in_ms: status
            .next_deadline
            .map(|due| due.saturating_duration_since(now).as_millis() as u64),
        signals: status.signals,
        reloads: status.reloads,
        stopped: monitor.is_stopped(),
        last_event: status.last_event,
    })
}
