//! KioskGateway - Kiosk Device Gateway
//!
//! Keeps an adb-over-TCP connection to a kiosk display alive, recovers the
//! control port when the device moves it, and drives the screen from the
//! device's proximity and light sensors.

mod api;
mod config;
mod device;
mod error;
mod models;
mod notify;
mod scanner;
mod sensors;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::device::{AdbTransport, ConnectionMonitor, DeviceManager};
use crate::notify::EventBus;
use crate::sensors::{BrightnessController, ProximityMonitor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiosk_gateway=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting KioskGateway...");

    // Load configuration
    let config = config::Config::load()?;
    tracing::info!("Configuration loaded");

    // Device manager over the adb binary
    let transport = Arc::new(AdbTransport::new(
        config.device.adb_path.clone(),
        Duration::from_secs(config.device.command_timeout_secs),
    ));
    let manager = Arc::new(DeviceManager::new(transport, config.device.address()));

    // Event bus and background loops
    let events = Arc::new(EventBus::new());
    let monitor = Arc::new(ConnectionMonitor::new(
        manager.clone(),
        events.clone(),
        &config.monitor,
        config.scanner.clone(),
    ));
    let proximity = Arc::new(ProximityMonitor::new(
        manager.clone(),
        events.clone(),
        &config.proximity,
    ));
    let brightness = Arc::new(BrightnessController::new(manager.clone(), &config.brightness));

    // Initial connection attempt (non-fatal, the monitor keeps retrying)
    match manager.connect().await {
        Ok(()) => tracing::info!("Connected to device at {}", manager.address().await),
        Err(e) => tracing::warn!("Initial connect failed, monitor will retry: {}", e),
    }

    start_background_tasks(monitor.clone(), proximity.clone(), brightness.clone());

    // Build application router
    let cors = CorsLayer::permissive();

    let state = AppState {
        manager,
        monitor: monitor.clone(),
        proximity: proximity.clone(),
        brightness: brightness.clone(),
        events,
    };

    let app = api::routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(monitor, proximity, brightness))
        .await?;

    Ok(())
}

/// Start background tasks (connection monitor, proximity monitor, brightness controller)
fn start_background_tasks(
    monitor: Arc<ConnectionMonitor>,
    proximity: Arc<ProximityMonitor>,
    brightness: Arc<BrightnessController>,
) {
    tokio::spawn(async move {
        monitor.start().await;
    });

    tokio::spawn(async move {
        proximity.start().await;
    });

    tokio::spawn(async move {
        brightness.start().await;
    });

    tracing::info!("Background tasks started");
}

/// Resolve on Ctrl-C, stopping the background loops so the server can drain.
async fn shutdown_signal(
    monitor: Arc<ConnectionMonitor>,
    proximity: Arc<ProximityMonitor>,
    brightness: Arc<BrightnessController>,
) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }

    tracing::info!("Shutting down");
    monitor.stop();
    proximity.stop();
    brightness.stop();
}
