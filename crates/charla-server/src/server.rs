//! `ChatServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use charla_responder::Responder;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::chat::{chat_handler, method_not_allowed};
use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::run_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Reply generator behind both transports.
    pub responder: Arc<dyn Responder>,
    /// Open WebSocket connections.
    pub connections: Arc<ConnectionRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
}

/// The Charla server.
pub struct ChatServer {
    state: AppState,
}

impl ChatServer {
    /// Create a server around `responder`.
    pub fn new(config: ServerConfig, responder: Arc<dyn Responder>) -> Self {
        Self {
            state: AppState {
                responder,
                connections: Arc::new(ConnectionRegistry::new()),
                shutdown: Arc::new(ShutdownCoordinator::new()),
                config: Arc::new(config),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/chat", post(chat_handler).fallback(method_not_allowed))
            .route("/api/socket", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and start serving in the background.
    ///
    /// Returns the bound address. The serve task is tracked by the shutdown
    /// coordinator, so [`shutdown`](Self::shutdown) also waits for the
    /// listener to close.
    pub async fn listen(&self) -> Result<SocketAddr, ServerError> {
        let addr = self.state.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let router = self.router();
        let token = self.state.shutdown.token();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server terminated with error");
            }
        });

        self.state.shutdown.track(handle);
        info!(addr = %local_addr, "charla server listening");
        Ok(local_addr)
    }

    /// Signal shutdown and wait for sessions and reply tasks to drain.
    pub async fn shutdown(&self) {
        info!("shutting down");
        self.state
            .shutdown
            .drain(self.state.config.shutdown_timeout)
            .await;
    }

    /// Open WebSocket connections.
    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.state.connections
    }

    /// Shutdown coordinator.
    pub fn coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }
}

/// GET /api/socket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let shutdown = Arc::clone(&state.shutdown);
        if shutdown.is_shutting_down() {
            return;
        }
        shutdown.track(tokio::spawn(run_session(socket, state)));
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.connections.count(),
    ))
}
