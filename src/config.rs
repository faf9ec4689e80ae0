//! Application configuration
//!
//! Every section has defaults, so an empty
//! or missing config file yields a working relay on `0.0.0.0:8765`.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::relay::pull::WindowPolicy;

/// Top-level configuration, one section per subsystem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub player: PlayerConfig,
    pub display: DisplayConfig,
}

/// WebSocket endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: String,
    /// TCP port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Resolve the bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind_address.parse().map_err(|e| {
            Error::Config(format!("invalid bind address {:?}: {}", self.bind_address, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Per-session relay behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Seconds of history each session's reader retains
    pub buffer_seconds: f64,
    /// Window sizing for each pull
    pub window: WindowPolicy,
    /// Pause between pulls, independent of the window policy
    pub poll_interval_ms: u64,
    /// Bound on each negotiation wait; `None` waits forever
    pub handshake_timeout_ms: Option<u64>,
    /// Attach the requested window duration to each data message
    pub include_winsize: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
            window: WindowPolicy::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            handshake_timeout_ms: None,
            include_winsize: true,
        }
    }
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_ms.map(Duration::from_millis)
    }

    /// Set the window policy
    pub fn window(mut self, policy: WindowPolicy) -> Self {
        self.window = policy;
        self
    }

    /// Set the poll interval
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the handshake timeout
    pub fn handshake_timeout_ms(mut self, ms: u64) -> Self {
        self.handshake_timeout_ms = Some(ms);
        self
    }
}

/// Simulated source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// CSV recording to replay; a synthetic recording is used when unset
    pub recording: Option<PathBuf>,
    /// Sample rate of the recording in Hz
    pub sample_rate: f64,
    /// Samples per pushed chunk
    pub chunk_size: usize,
    pub stream_name: String,
    pub stream_type: String,
    /// Fixed source id; a random one is generated when unset
    pub source_id: Option<String>,
    /// Channels of the synthetic recording
    pub synthetic_channels: Vec<String>,
    /// Length of the synthetic recording before it loops
    pub synthetic_seconds: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            recording: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            stream_name: DEFAULT_STREAM_NAME.to_string(),
            stream_type: "EEG".to_string(),
            source_id: None,
            synthetic_channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            synthetic_seconds: 60.0,
        }
    }
}


/// Local plot output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
    /// PNG file rewritten on every update
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output: PathBuf::from("eeg_window.png"),
            width: 900,
            height: 600,
        }
    }
}

impl AppConfig {
    /// Parse a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, else the per-user config file, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::info!(path = %path.display(), "Loading config");
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/eeg-relay/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "eeg-relay")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reject values the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;

        let relay = &self.relay;
        if !(relay.buffer_seconds.is_finite() && relay.buffer_seconds > 0.0) {
            return Err(Error::Config("relay.buffer_seconds must be positive".into()));
        }
        if relay.buffer_seconds > MAX_BUFFER_SECONDS {
            return Err(Error::Config(format!(
                "relay.buffer_seconds must be at most {}",
                MAX_BUFFER_SECONDS
            )));
        }
        if let WindowPolicy::Fixed { seconds } = relay.window {
            if !(seconds.is_finite() && seconds > 0.0) {
                return Err(Error::Config("relay.window.seconds must be positive".into()));
            }
        }
        if relay.poll_interval_ms == 0 {
            return Err(Error::Config("relay.poll_interval_ms must be positive".into()));
        }
        if self.player.chunk_size == 0 {
            return Err(Error::Config("player.chunk_size must be positive".into()));
        }
        if !(self.player.sample_rate.is_finite() && self.player.sample_rate > 0.0) {
            return Err(Error::Config("player.sample_rate must be positive".into()));
        }
        if self.player.recording.is_none() && self.player.synthetic_channels.is_empty() {
            return Err(Error::Config("player.synthetic_channels must not be empty".into()));
        }
        Ok(())
    }
}
