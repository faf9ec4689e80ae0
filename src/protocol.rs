//! Wire messages exchanged with browser clients
//!
//! Server messages serialize untagged so the JSON field names are exactly
//! the ones existing clients read (`streams`, `channels`, `error`,
//! `timestamps`/`data`/`selected_channels`/`winsize`). Client messages are
//! parsed strictly; unknown fields are a protocol error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::lsl::info::{StreamInfo, Window};

/// Everything the server sends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    StreamList { streams: Vec<String> },
    ChannelList { channels: Vec<String> },
    Error { error: String },
    DataWindow(DataWindow),
}

impl ServerMessage {
    pub fn stream_list(streams: &[StreamInfo]) -> Self {
        ServerMessage::StreamList {
            streams: streams.iter().map(|s| s.name.clone()).collect(),
        }
    }

    pub fn channel_list(info: &StreamInfo) -> Self {
        ServerMessage::ChannelList {
            channels: info.channel_names.clone(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            error: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One relayed window of samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataWindow {
    pub timestamps: Vec<f64>,
    /// `data[channel][sample]`, rows in `selected_channels` order
    pub data: Vec<Vec<f64>>,
    #[serde(alias = "ch_names")]
    pub selected_channels: Vec<String>,
    /// Requested window duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winsize: Option<f64>,
}

impl DataWindow {
    pub fn new(window: Window, selected_channels: Vec<String>, winsize: Option<f64>) -> Self {
        Self {
            timestamps: window.timestamps,
            data: window.data,
            selected_channels,
            winsize,
        }
    }

    /// Rows match the channel list and every row matches the timestamps
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.selected_channels.len()
            && self.data.iter().all(|row| row.len() == self.timestamps.len())
    }
}

/// Client's first reply: which stream to relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamChoice {
    pub stream_name: String,
}

/// Client's second reply: which channels to relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelChoice {
    pub selected_channels: Vec<String>,
}

/// Parse an inbound text frame into the expected client message
pub fn parse_client<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}
