//! Device connection and screen control handlers

use axum::{extract::State, response::IntoResponse, Json};

use crate::api::AppState;
use crate::error::AppError;
use crate::models::{
    BrightnessRequest, ConnectionInfo, EnabledRequest, ScreenTimeoutRequest, SetAddressRequest,
};

use super::SuccessResponse;

/// GET /api/device/status - Best-effort snapshot of the device
pub async fn get_device_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.get_status().await)
}

/// GET /api/device/connection - Cached readiness plus a live probe
pub async fn get_connection(State(state): State<AppState>) -> impl IntoResponse {
    Json(ConnectionInfo {
        address: state.manager.address().await,
        ready: state.manager.is_ready().await,
        connected: state.manager.is_connected().await,
    })
}

/// POST /api/device/connect - Connect to the configured address
pub async fn connect_device(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.manager.connect().await?;

    tracing::info!("Connected to {}", state.manager.address().await);

    Ok(Json(SuccessResponse::new("Connected")))
}

/// PUT /api/device/address - Point the gateway at a new device address
pub async fn set_address(
    State(state): State<AppState>,
    Json(payload): Json<SetAddressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let host = payload.host.trim();
    if host.is_empty() {
        return Err(AppError::BadRequest("Host must not be empty".to_string()));
    }
    if payload.port == 0 {
        return Err(AppError::BadRequest("Port must be non-zero".to_string()));
    }

    let address = format!("{}:{}", host, payload.port);
    state.manager.set_address(&address).await?;

    Ok(Json(SuccessResponse::new(format!(
        "Address set to {}",
        address
    ))))
}

/// POST /api/device/rediscover - Scan the device host for a moved port
pub async fn rediscover_port(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let port = state.monitor.run_rediscovery().await?;
    Ok(Json(serde_json::json!({ "port": port })))
}

/// POST /api/device/screen/wake - Wake the display
pub async fn wake_screen(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.manager.wake_screen().await?;
    Ok(Json(SuccessResponse::new("Screen woken")))
}

/// POST /api/device/screen/sleep - Put the display to sleep
pub async fn sleep_screen(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.manager.sleep_screen().await?;
    Ok(Json(SuccessResponse::new("Screen asleep")))
}

/// PUT /api/device/screen/brightness - Set brightness, clamped to 0-255
pub async fn set_brightness(
    State(state): State<AppState>,
    Json(payload): Json<BrightnessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let applied = state.manager.set_brightness(payload.level).await?;
    Ok(Json(serde_json::json!({ "applied": applied })))
}

/// PUT /api/device/screen/auto-brightness - Toggle the device's own auto mode
pub async fn set_auto_brightness(
    State(state): State<AppState>,
    Json(payload): Json<EnabledRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.manager.set_auto_brightness(payload.enabled).await?;

    let message = if payload.enabled {
        "Auto-brightness enabled"
    } else {
        "Auto-brightness disabled"
    };
    Ok(Json(SuccessResponse::new(message)))
}

/// PUT /api/device/screen/timeout - Screen-off timeout in seconds
pub async fn set_screen_timeout(
    State(state): State<AppState>,
    Json(payload): Json<ScreenTimeoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.seconds == 0 {
        return Err(AppError::BadRequest(
            "Timeout must be at least one second".to_string(),
        ));
    }

    state.manager.set_screen_timeout(payload.seconds).await?;

    Ok(Json(SuccessResponse::new(format!(
        "Screen timeout set to {}s",
        payload.seconds
    ))))
}
