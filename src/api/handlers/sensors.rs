//! Sensor loop handlers

use axum::{extract::State, response::IntoResponse, Json};

use crate::api::AppState;
use crate::models::{BrightnessStatus, EnabledRequest, ProximityStatus, SensorsStatus};

use super::SuccessResponse;

/// GET /api/sensors/status - State of the proximity and brightness loops
pub async fn get_sensors_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(SensorsStatus {
        proximity: ProximityStatus {
            running: state.proximity.is_running(),
            near: state.proximity.near().await,
        },
        brightness: BrightnessStatus {
            running: state.brightness.is_running(),
            enabled: state.brightness.is_enabled().await,
        },
    })
}

/// PUT /api/sensors/brightness - Toggle the adaptive brightness loop
pub async fn toggle_adaptive_brightness(
    State(state): State<AppState>,
    Json(payload): Json<EnabledRequest>,
) -> impl IntoResponse {
    state.brightness.set_enabled(payload.enabled).await;

    let message = if payload.enabled {
        "Adaptive brightness enabled"
    } else {
        "Adaptive brightness disabled"
    };
    Json(SuccessResponse::new(message))
}
