//! One client connection as seen by the relay loop

use async_trait::async_trait;

use crate::error::{ProtocolError, SessionError};
use crate::protocol::ServerMessage;

/// Ordered, bidirectional text channel to a single client
#[async_trait]
pub trait Transport: Send {
    /// Send one message. Any failure means the client is gone.
    async fn send(&mut self, message: &ServerMessage) -> Result<(), SessionError>;

    /// Next inbound text frame; `None` once the client has disconnected.
    ///
    /// Must be cancel-safe: the relay races it against its poll timer.
    async fn recv(&mut self) -> Option<Result<String, ProtocolError>>;

    /// Close the connection
    async fn close(&mut self);
}
