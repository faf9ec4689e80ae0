//! # EEG Relay
//!
//! Real-time relay of multi-channel EEG streams to browser clients over
//! WebSocket.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         STREAM LAYER (lsl)                           │
//! │  ┌────────────┐   ┌──────────────┐   ┌────────────────────────────┐ │
//! │  │ Recording  │──▶│   Player     │──▶│   Outlet (registry entry)  │ │
//! │  │ CSV/synth  │   │ tokio task,  │   │   fan-out of every chunk   │ │
//! │  └────────────┘   │ chunk/tick   │   └─────────────┬──────────────┘ │
//! │                   └──────────────┘                 │                │
//! │                                     ┌──────────────┼──────────────┐ │
//! │                                     ▼              ▼              ▼ │
//! │                              ┌────────────┐ ┌────────────┐        … │
//! │                              │ RingBuffer │ │ RingBuffer │          │
//! │                              │ (reader 1) │ │ (reader 2) │          │
//! │                              └─────┬──────┘ └─────┬──────┘          │
//! └────────────────────────────────────┼──────────────┼─────────────────┘
//!                                      │ get_data     │
//!                                      ▼              ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         RELAY (relay)                                │
//! │   Session 1: streams ─▶ choose ─▶ channels ─▶ choose ─▶ windows…    │
//! │   Session 2: …                                                       │
//! │        │                                     │                       │
//! │        ▼                                     ▼                       │
//! │   Transport (server::WsTransport)       DisplaySink (display)        │
//! └────────┼─────────────────────────────────────────────────────────────┘
//!          │ JSON text frames
//!          ▼
//!     Browser clients  ws://<host>:8765/
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod lsl;
pub mod protocol;
pub mod relay;
pub mod server;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default WebSocket bind address
    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

    /// Default WebSocket port
    pub const DEFAULT_PORT: u16 = 8765;

    /// Reader ring buffer length in seconds
    pub const DEFAULT_BUFFER_SECONDS: f64 = 2.0;

    /// Longest reader history a config may ask for
    pub const MAX_BUFFER_SECONDS: f64 = 3600.0;

    /// Hard cap on samples held by one reader buffer
    pub const MAX_BUFFER_SAMPLES: usize = 1 << 22;

    /// Pause between pulls while streaming
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

    /// Nominal sample rate of the simulated stream (Hz)
    pub const DEFAULT_SAMPLE_RATE: f64 = 250.0;

    /// Samples per pushed chunk
    pub const DEFAULT_CHUNK_SIZE: usize = 200;

    /// Name the simulated stream is advertised under
    pub const DEFAULT_STREAM_NAME: &str = "SimEEG";

    /// Channels of the synthetic recording
    pub const DEFAULT_CHANNELS: [&str; 6] = ["Fp1", "Fp2", "Cz", "O1", "O2", "Pz"];

    /// Channels the viewer plots
    pub const VIEWER_CHANNELS: usize = 6;
}
