//! EEG Relay Server
//!
//! Replays a recording as a live stream and relays windows of it to
//! WebSocket clients.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eeg_relay::{
    config::{AppConfig, PlayerConfig},
    display,
    lsl::{Player, Recording, StreamRegistry},
    relay::{LocalDiscovery, Relay},
    server::RelayServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EEG relay");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load_or_default(config_path.as_deref()).context("Failed to load configuration")?;

    let registry = StreamRegistry::new();
    let recording = load_recording(&config.player)?;
    let player = Player::start(&registry, recording, &config.player).context("Failed to start player")?;

    println!("\n=== Simulated Stream ===");
    println!("  Name: {}", player.info().name);
    println!("  Source ID: {}", player.info().source_id);
    println!("  Sample rate: {} Hz", player.info().sample_rate);
    println!("  Channels: {}", player.info().channel_names.join(", "));
    println!();

    let mut relay = Relay::new(LocalDiscovery::new(registry), config.relay.clone());
    if config.display.enabled {
        relay = relay.with_display(display::from_config(&config.display));
    }

    tracing::info!(
        "Clients connect at ws://{}:{}/",
        config.server.bind_address,
        config.server.port
    );

    let server = RelayServer::new(config.server.clone(), relay);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
            tracing::info!("Shutting down...");
        })
        .await?;

    drop(player);
    Ok(())
}

fn load_recording(config: &PlayerConfig) -> Result<Recording> {
    let recording = match &config.recording {
        Some(path) => Recording::from_csv(path, config.sample_rate)
            .with_context(|| format!("Failed to read recording {}", path.display()))?,
        None => {
            tracing::info!("No recording configured, generating synthetic EEG");
            Recording::synthetic(
                config.synthetic_channels.clone(),
                config.sample_rate,
                config.synthetic_seconds,
            )?
        }
    };
    Ok(recording)
}
