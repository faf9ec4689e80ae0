//! WebSocket connections adapted to the relay's transport

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use futures_util::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{ProtocolError, SessionError};
use crate::protocol::ServerMessage;
use crate::relay::{StreamDiscovery, Transport};
use crate::server::AppState;

/// Upgrade and hand the socket to a fresh relay session
pub async fn ws_handler<D: StreamDiscovery>(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState<D>>>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        tracing::info!(peer = %addr, "Client connected");
        let summary = state.relay.run_session(WsTransport::new(socket)).await;
        tracing::info!(
            peer = %addr,
            session_id = summary.session_id,
            windows_sent = summary.windows_sent,
            "Client finished: {}",
            summary.end
        );
    })
}

/// One upgraded socket
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, message: &ServerMessage) -> Result<(), SessionError> {
        let text = message
            .to_json()
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|_| SessionError::Disconnected)
    }

    async fn recv(&mut self) -> Option<Result<String, ProtocolError>> {
        loop {
            match self.socket.recv().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(_)) => return Some(Err(ProtocolError::UnexpectedBinary)),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => return None,
                Err(e) => {
                    tracing::debug!("WebSocket receive error: {}", e);
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = SinkExt::close(&mut self.socket).await {
            tracing::trace!("Close after disconnect: {}", e);
        }
    }
}
