//! WebSocket endpoint and read-only HTTP API

pub mod handlers;
pub mod websocket;

use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::relay::{Relay, StreamDiscovery};

pub use websocket::WsTransport;

/// State shared by every handler
pub struct AppState<D: StreamDiscovery> {
    pub relay: Relay<D>,
    pub started: Instant,
}

/// Serves relay sessions over WebSocket
pub struct RelayServer<D: StreamDiscovery> {
    config: ServerConfig,
    state: Arc<AppState<D>>,
}

impl<D: StreamDiscovery> RelayServer<D> {
    pub fn new(config: ServerConfig, relay: Relay<D>) -> Self {
        Self {
            config,
            state: Arc::new(AppState {
                relay,
                started: Instant::now(),
            }),
        }
    }

    /// Routes: WebSocket at `/` and `/ws`, JSON at `/health` and `/api/streams`
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(websocket::ws_handler::<D>))
            .route("/ws", get(websocket::ws_handler::<D>))
            .route("/health", get(handlers::health::<D>))
            .route("/api/streams", get(handlers::list_streams::<D>))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until the task is dropped
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.serve_until(listener, std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then let open sessions finish
    pub async fn serve_until<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        tracing::info!("Relay listening on ws://{}", listener.local_addr()?);

        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Relay stopped");
        Ok(())
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Bind the configured address and serve in a background task
    pub async fn start_background(self) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
        let listener = TcpListener::bind(self.config.socket_addr()?).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(self.serve(listener));
        Ok((addr, handle))
    }
}
