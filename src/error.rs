//! Error types for the EEG relay

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the stream layer (players, registry, readers)
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Reader is not connected")]
    NotConnected,

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid recording: {0}")]
    InvalidRecording(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire-level errors on inbound client messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unexpected binary frame")]
    UnexpectedBinary,
}

/// Reasons a relay session ends
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No streams available")]
    NoStreams,

    #[error("Invalid stream name: {0}")]
    InvalidStreamName(String),

    #[error("Failed to connect to stream: {0}")]
    ConnectFailed(#[source] StreamError),

    #[error("Invalid channel selection: {0:?}")]
    InvalidChannelSelection(Vec<String>),

    #[error("Handshake timed out")]
    HandshakeTimeout,

    #[error("Client disconnected")]
    Disconnected,

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl SessionError {
    /// The error text sent to the client before the session is closed.
    ///
    /// Only negotiation failures are user-visible; everything else is log-only.
    pub fn client_message(&self) -> Option<&'static str> {
        match self {
            SessionError::NoStreams => Some("No streams available."),
            SessionError::InvalidStreamName(_) => Some("Invalid stream name."),
            SessionError::ConnectFailed(_) => Some("Failed to connect to stream."),
            SessionError::InvalidChannelSelection(_) => Some("Invalid channel selection."),
            _ => None,
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
