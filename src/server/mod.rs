//! Transport listener
//!
//! Binds the gateway's TCP listener and owns the process lifecycle. Every
//! path serves the WebSocket upgrade; plain HTTP requests get a fixed 404,
//! as the service has no content outside the message channel. Startup
//! failures (port in use, permission denied) are fatal and returned to the
//! caller rather than retried.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{connect_info::ConnectInfo, ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::watcher::Watcher;
use crate::websocket::{handle_socket, BroadcastRelay, ConnectionHub, HubConfig, RequestRouter};

/// Shared state for all connections
pub struct GatewayState {
    /// The watcher facade commands are dispatched to
    pub watcher: Arc<dyn Watcher>,
    /// Registry of live connections
    pub hub: Arc<ConnectionHub>,
    /// Router turning inbound frames into responses
    pub router: RequestRouter,
}

impl GatewayState {
    /// Wire up gateway state around a watcher
    pub fn new(watcher: Arc<dyn Watcher>, hub_config: HubConfig) -> Self {
        Self {
            router: RequestRouter::new(Arc::clone(&watcher)),
            hub: Arc::new(ConnectionHub::new(hub_config)),
            watcher,
        }
    }
}

/// Errors from the transport listener
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Binding the listener failed; this is fatal, not transient
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed after startup
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the gateway router
///
/// A single fallback handler covers every path: upgrade requests get the
/// message channel, anything else gets 404.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .fallback(gateway_endpoint)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Upgrade-or-404 entry point for all paths
async fn gateway_endpoint(
    ws: Option<WebSocketUpgrade>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    let peer = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match ws {
        Some(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, peer)),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A running gateway
///
/// Created by [`Gateway::start`]; [`Gateway::stop`] closes the listener and
/// forcibly closes the remaining connections.
pub struct Gateway {
    local_addr: SocketAddr,
    state: Arc<GatewayState>,
    shutdown: watch::Sender<bool>,
    serve_task: JoinHandle<Result<(), GatewayError>>,
    relay_task: JoinHandle<()>,
}

impl Gateway {
    /// Bind the listener and begin accepting connections
    ///
    /// Also takes the single watcher subscription that feeds the broadcast
    /// relay for the lifetime of the server.
    pub async fn start(
        config: &ServerConfig,
        state: Arc<GatewayState>,
    ) -> Result<Self, GatewayError> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let relay_task = BroadcastRelay::spawn(state.watcher.subscribe(), Arc::clone(&state.hub));

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let router = build_router(Arc::clone(&state));
        let serve_task = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
            .map_err(GatewayError::from)
        });

        tracing::info!(addr = %local_addr, "gateway listening");
        Ok(Self {
            local_addr,
            state,
            shutdown,
            serve_task,
            relay_task,
        })
    }

    /// Address the listener actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared gateway state
    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    /// Close the listener and forcibly close live connections
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        // Dropping the per-connection senders ends each send task, which
        // tears the connection down and lets the accept loop finish.
        self.state.hub.drain().await;
        self.relay_task.abort();

        match self.serve_task.await {
            Ok(Ok(())) => tracing::info!("gateway stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "gateway exited with error"),
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "gateway task failed");
                }
            }
        }
    }
}

/// Wait for ctrl-c or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
