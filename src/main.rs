use anyhow::{Context, Result};
use pacer_bridge::domain::settings::{Settings, SettingsService};
use pacer_bridge::infrastructure::location::ReplayProvider;
use pacer_bridge::infrastructure::logging::init_logger;
use pacer_bridge::infrastructure::transport::LocalSocketTransport;
use pacer_bridge::LocationBridge;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};

fn main() -> Result<()> {
    let settings_service = SettingsService::new().context("Failed to load settings")?;
    let mut settings = settings_service.get().clone();

    // A track given on the command line overrides the configured one
    if let Some(track) = std::env::args().nth(1) {
        settings.location.replay_path = Some(PathBuf::from(track));
    }

    let _logging_guard = init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Pacer bridge starting");
    info!("Settings file: {}", settings_service.path().display());

    // Everything runs cooperatively on one thread
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(run(settings))
}

async fn run(settings: Settings) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let provider = ReplayProvider::from_settings(&settings.location)
        .context("No location source (pass a track file or set location.replay_path)")?;
    let transport = LocalSocketTransport::listen(&settings.transport.socket_name, event_tx.clone())
        .context("Failed to open peer socket")?;

    let mut bridge = LocationBridge::new(provider, transport, event_tx, &settings);
    info!("Waiting for peer on {}", settings.transport.socket_name);

    tokio::select! {
        _ = bridge.run(event_rx) => {}
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => info!("Shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        },
    }

    bridge.stop();
    Ok(())
}
