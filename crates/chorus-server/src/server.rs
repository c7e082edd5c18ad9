//! `ChorusServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chorus_synth::AudioSink;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::connection::{ConnectionConfig, run_ws_session};
use crate::dispatch::Dispatcher;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::registry::SessionRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::sweeper::Sweeper;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Message routing (owns the registry handle).
    pub dispatcher: Dispatcher,
    /// Per-connection settings.
    pub connection: ConnectionConfig,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

/// The chorus session server.
pub struct ChorusServer {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
}

impl ChorusServer {
    /// Create a server that plays sounds through `sink`.
    pub fn new(config: ServerConfig, sink: Arc<dyn AudioSink>) -> Self {
        let registry = Arc::new(SessionRegistry::new(sink, config.sound));
        Self {
            config,
            registry,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics: None,
            start_time: Instant::now(),
        }
    }

    /// Expose `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            dispatcher: Dispatcher::new(Arc::clone(&self.registry)),
            connection: ConnectionConfig {
                max_send_queue: self.config.max_send_queue,
                ping_interval: self.config.ping_interval,
            },
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        let mut router = Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler));
        if self.metrics.is_some() {
            router = router.route("/metrics", get(metrics_handler));
        }
        let mut router = router.with_state(state);
        if let Some(dir) = &self.config.static_dir {
            router = router.fallback_service(ServeDir::new(dir));
        }
        router
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind, start the sweeper and serve until shutdown.
    ///
    /// Returns the bound address and the serve task. The sweeper is tracked
    /// by the shutdown coordinator.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let bind = self.config.bind_addr();
        let listener = TcpListener::bind(&bind)
            .await
            .map_err(|source| ServerError::Bind { addr: bind, source })?;
        let addr = listener.local_addr()?;

        let sweeper = Sweeper::new(Arc::clone(&self.registry), self.config.sweep_interval);
        self.shutdown.track(sweeper.spawn(self.shutdown.token()));

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
        });

        info!(%addr, "chorus server listening");
        Ok((addr, handle))
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let token = state.shutdown.token();
    ws.on_upgrade(move |socket| run_ws_session(socket, state.dispatcher, state.connection, token))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.dispatcher.registry();
    Json(health::health_check(
        state.start_time,
        registry.client_count(),
        registry.sound_count(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
