//! Windowed stream reader
//!
//! Connects to an advertised stream by source id and keeps `bufsize`
//! seconds of trailing history in its own ring buffer.

use crate::constants::MAX_BUFFER_SAMPLES;
use crate::error::StreamError;
use crate::lsl::buffer::{create_shared_buffer, BufferStats, SharedRingBuffer};
use crate::lsl::info::{StreamInfo, Window};
use crate::lsl::registry::StreamRegistry;

/// One reader connection to one stream
pub struct StreamReader {
    info: StreamInfo,
    registry: StreamRegistry,
    buffer: SharedRingBuffer,
    connected: bool,
}

impl StreamReader {
    /// Connect to the stream advertised under `source_id`, retaining
    /// `bufsize` seconds of history.
    pub fn connect(
        registry: &StreamRegistry,
        source_id: &str,
        bufsize: f64,
    ) -> Result<Self, StreamError> {
        if !(bufsize.is_finite() && bufsize > 0.0) {
            return Err(StreamError::InvalidConfig(format!(
                "buffer size must be positive, got {}",
                bufsize
            )));
        }

        let info = registry
            .find(source_id)
            .ok_or_else(|| StreamError::StreamNotFound(source_id.to_string()))?;

        let samples = (bufsize * info.sample_rate).ceil();
        if !(samples.is_finite() && samples <= MAX_BUFFER_SAMPLES as f64) {
            return Err(StreamError::InvalidConfig(format!(
                "buffer of {} s at {} Hz exceeds {} samples",
                bufsize, info.sample_rate, MAX_BUFFER_SAMPLES
            )));
        }
        let capacity = samples as usize;
        let buffer = create_shared_buffer(capacity, info.channel_count());
        let info = registry.attach(source_id, &buffer)?;

        tracing::info!(
            stream = %info.name,
            source_id = %info.source_id,
            capacity,
            "Connected to stream"
        );

        Ok(Self {
            info,
            registry: registry.clone(),
            buffer,
            connected: true,
        })
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn ch_names(&self) -> &[String] {
        &self.info.channel_names
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Samples arrived since the previous pull
    pub fn n_new_samples(&self) -> usize {
        self.buffer.lock().n_new_samples()
    }

    /// Most recent `winsize` seconds of the picked channels, or the whole
    /// buffer when `winsize` is `None`.
    pub fn get_data(
        &self,
        winsize: Option<f64>,
        picks: &[String],
    ) -> Result<Window, StreamError> {
        if !self.connected {
            return Err(StreamError::NotConnected);
        }

        let rows = self.info.resolve_picks(picks)?;
        let n_samples = match winsize {
            Some(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                Some((seconds * self.info.sample_rate).round() as usize)
            }
            Some(seconds) => {
                return Err(StreamError::InvalidConfig(format!(
                    "window size must be non-negative, got {}",
                    seconds
                )))
            }
            None => None,
        };

        Ok(self.buffer.lock().latest(n_samples, &rows))
    }

    /// Everything pushed since the previous pull, read and reset under one lock
    pub fn take_unread(&self, picks: &[String]) -> Result<Window, StreamError> {
        if !self.connected {
            return Err(StreamError::NotConnected);
        }
        let rows = self.info.resolve_picks(picks)?;
        Ok(self.buffer.lock().take_unread(&rows))
    }

    pub fn buffer_stats(&self) -> BufferStats {
        self.buffer.lock().stats()
    }

    /// Detach from the stream. Safe to call more than once.
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.registry.detach(&self.info.source_id, &self.buffer);
        self.connected = false;

        tracing::info!(source_id = %self.info.source_id, "Disconnected from stream");
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        self.disconnect();
    }
}
