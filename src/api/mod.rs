//! API module - HTTP handlers and routes

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::device::{ConnectionMonitor, DeviceManager};
use crate::notify::EventBus;
use crate::sensors::{BrightnessController, ProximityMonitor};

/// Shared handles behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DeviceManager>,
    pub monitor: Arc<ConnectionMonitor>,
    pub proximity: Arc<ProximityMonitor>,
    pub brightness: Arc<BrightnessController>,
    pub events: Arc<EventBus>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Device status and connection
        .route("/api/device/status", get(handlers::get_device_status))
        .route("/api/device/connection", get(handlers::get_connection))
        .route("/api/device/connect", post(handlers::connect_device))
        .route("/api/device/address", put(handlers::set_address))
        .route("/api/device/rediscover", post(handlers::rediscover_port))
        // Screen control
        .route("/api/device/screen/wake", post(handlers::wake_screen))
        .route("/api/device/screen/sleep", post(handlers::sleep_screen))
        .route(
            "/api/device/screen/brightness",
            put(handlers::set_brightness),
        )
        .route(
            "/api/device/screen/auto-brightness",
            put(handlers::set_auto_brightness),
        )
        .route(
            "/api/device/screen/timeout",
            put(handlers::set_screen_timeout),
        )
        // Sensor loops
        .route("/api/sensors/status", get(handlers::get_sensors_status))
        .route(
            "/api/sensors/brightness",
            put(handlers::toggle_adaptive_brightness),
        )
        // Event log
        .route("/api/events", get(handlers::list_events))
}
