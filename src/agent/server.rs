use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::{net::TcpListener, sync::Mutex};

use super::{
    config::{AgentConfig, SystemRequest},
    snapshot::{self, SystemInfo},
};
use crate::{error::AgentError, steps::health::HEALTH_PATH};

/// How long a collected snapshot is served before it is collected again.
pub const CACHE_TTL: Duration = Duration::from_secs(1);

pub type Collector = Arc<dyn Fn() -> (SystemInfo, Vec<String>) + Send + Sync>;

// ── State ─────────────────────────────────────────────────────────────────────

struct AppState {
    /// `Bearer <token>`, or empty when authentication is off.
    authorization: Vec<u8>,
    collector: Collector,
    cache: Mutex<Cache>,
}

#[derive(Default)]
struct Cache {
    json: Vec<u8>,
    updated: Option<Instant>,
}

impl Cache {
    fn is_stale(&self) -> bool {
        self.updated.map_or(true, |at| at.elapsed() > CACHE_TTL)
    }
}

impl AppState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        if self.authorization.is_empty() {
            return true;
        }
        let given = headers
            .get(header::AUTHORIZATION)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        constant_time_eq(given, &self.authorization)
    }
}

/// Compares without an early exit on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Routes ────────────────────────────────────────────────────────────────────

pub fn router(token: &str, collector: Collector) -> Router {
    let authorization = if token.is_empty() {
        Vec::new()
    } else {
        format!("Bearer {token}").into_bytes()
    };
    let state = Arc::new(AppState {
        authorization,
        collector,
        cache: Mutex::new(Cache::default()),
    });

    Router::new()
        .route(HEALTH_PATH, get(healthz))
        .route("/api/sysinfo/all", get(sysinfo_all))
        .with_state(state)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

async fn healthz(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    StatusCode::OK.into_response()
}

async fn sysinfo_all(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }

    let mut cache = state.cache.lock().await;
    if cache.is_stale() {
        let collector = Arc::clone(&state.collector);
        let (info, warnings) = match tokio::task::spawn_blocking(move || collector()).await {
            Ok(collected) => collected,
            Err(e) => {
                log::error!("system info collection did not finish: {e}");
                return internal_error();
            }
        };
        for warning in &warnings {
            log::debug!("error while collecting system info: {warning}");
        }

        match serde_json::to_vec(&info) {
            Ok(json) => {
                cache.json = json;
                cache.updated = Some(Instant::now());
            }
            Err(e) => {
                log::error!("could not serialize system info: {e}");
                return internal_error();
            }
        }
    }

    ([(header::CONTENT_TYPE, "application/json")], cache.json.clone()).into_response()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

// ── Serving ───────────────────────────────────────────────────────────────────

/// Blocks serving the API until Ctrl-C or SIGTERM.
pub fn serve(config: AgentConfig) -> Result<(), AgentError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: AgentConfig) -> Result<(), AgentError> {
    let host = if config.server.host.is_empty() {
        "0.0.0.0"
    } else {
        config.server.host.as_str()
    };
    let listener = TcpListener::bind((host, config.server.port)).await?;

    let request: Arc<SystemRequest> = Arc::new(config.system);
    let collector: Collector = Arc::new(move || snapshot::collect(&request));
    let app = router(&config.server.token, collector);

    log::info!(
        "starting server on {host}:{} (authentication {})",
        config.server.port,
        if config.server.token.is_empty() { "off" } else { "on" }
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
