//! Real-time playback of a recording as an advertised stream
//!
//! Each player owns one outlet and one tokio task that pushes
//! `chunk_size` samples every `chunk_size / sample_rate` seconds, looping
//! the recording indefinitely.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::PlayerConfig;
use crate::error::StreamError;
use crate::lsl::info::{local_clock, Chunk, StreamInfo};
use crate::lsl::recording::Recording;
use crate::lsl::registry::{Outlet, StreamRegistry};

/// Running playback of one recording
pub struct Player {
    info: StreamInfo,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Player {
    /// Advertise the recording and start pushing chunks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        registry: &StreamRegistry,
        recording: Recording,
        config: &PlayerConfig,
    ) -> Result<Self, StreamError> {
        if config.chunk_size == 0 {
            return Err(StreamError::InvalidConfig("chunk size must be positive".into()));
        }

        let source_id = config
            .source_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let info = StreamInfo::new(
            config.stream_name.clone(),
            config.stream_type.clone(),
            source_id,
            recording.sample_rate,
            recording.channel_names.clone(),
        )?;

        let outlet = registry.advertise(info.clone())?;
        let interval = Duration::from_secs_f64(config.chunk_size as f64 / recording.sample_rate);

        tracing::info!(
            stream = %info.name,
            source_id = %info.source_id,
            sample_rate = info.sample_rate,
            channels = info.channel_count(),
            interval_secs = interval.as_secs_f64(),
            "Player started"
        );

        let handle = tokio::spawn(run_playback(outlet, recording, config.chunk_size, interval));

        Ok(Self {
            info,
            interval,
            handle: Some(handle),
        })
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Time between chunk pushes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop playback; the outlet is withdrawn when the task is dropped
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!(source_id = %self.info.source_id, "Player stopped");
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_playback(outlet: Outlet, recording: Recording, chunk_size: usize, interval: Duration) {
    let sample_rate = recording.sample_rate;
    let start_time = local_clock();
    let mut position = 0usize;
    let mut pushed = 0u64;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First chunk goes out one interval after start so its samples are not
    // stamped in the future.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let timestamps = (0..chunk_size)
            .map(|i| start_time + (pushed + i as u64) as f64 / sample_rate)
            .collect();
        let chunk = Chunk {
            timestamps,
            data: recording.slice_looped(position, chunk_size),
        };

        if let Err(e) = outlet.push_chunk(&chunk) {
            tracing::error!(source_id = %outlet.info().source_id, error = %e, "Failed to push chunk");
            return;
        }

        position = (position + chunk_size) % recording.n_samples();
        pushed += chunk_size as u64;
    }
}
