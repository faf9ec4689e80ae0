//! EEG Viewer
//!
//! Local-only loop: plays the configured recording, reads it back through a
//! stream reader and feeds the newest samples of the first channels to the
//! display.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eeg_relay::{
    config::AppConfig,
    constants::VIEWER_CHANNELS,
    display::{self, DisplayHandle, DisplaySink, LogDisplay},
    lsl::{Player, Recording, StreamReader, StreamRegistry},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load_or_default(config_path.as_deref()).context("Failed to load configuration")?;

    let registry = StreamRegistry::new();
    let recording = match &config.player.recording {
        Some(path) => Recording::from_csv(path, config.player.sample_rate)?,
        None => Recording::synthetic(
            config.player.synthetic_channels.clone(),
            config.player.sample_rate,
            config.player.synthetic_seconds,
        )?,
    };
    let player = Player::start(&registry, recording, &config.player)?;

    let mut reader = StreamReader::connect(&registry, &player.info().source_id, config.relay.buffer_seconds)?;
    let picks: Vec<String> = reader
        .ch_names()
        .iter()
        .take(VIEWER_CHANNELS)
        .cloned()
        .collect();

    let sink: Box<dyn DisplaySink> = if config.display.enabled {
        display::from_config(&config.display)
    } else {
        Box::new(LogDisplay::default())
    };
    let display = DisplayHandle::spawn(sink);

    tracing::info!(channels = ?picks, "Viewer running - press Ctrl+C to stop");

    let mut ticker = tokio::time::interval(config.relay.poll_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let window = reader.take_unread(&picks)?;
                if !window.is_empty() {
                    display.show(window, &picks);
                }
            }
        }
    }

    let stats = reader.buffer_stats();
    tracing::info!(
        pushed = stats.samples_pushed,
        overflows = stats.overflow_count,
        "Viewer stopped"
    );
    reader.disconnect();
    drop(player);
    Ok(())
}
