//! Data models for KioskGateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Device Status Models
// ============================================================================

/// Best-effort device snapshot. Fields that fail to query stay at their
/// zero value; `Default` is the fully-disconnected snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub connected: bool,
    pub screen_on: bool,
    pub battery_level: i64,
    pub battery_charging: bool,
    pub brightness: i64,
    /// Screen-off timeout in seconds (stored on-device in milliseconds).
    pub screen_timeout: u64,
    pub light_level: f32,
}

/// Cached vs live connection view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub address: String,
    pub ready: bool,
    pub connected: bool,
}

// ============================================================================
// Event Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Reconnected,
    Approach,
    Depart,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Request Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SetAddressRequest {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct BrightnessRequest {
    /// Requested level; applied value is clamped into [0, 255].
    pub level: i64,
}

#[derive(Debug, Deserialize)]
pub struct ScreenTimeoutRequest {
    pub seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct EnabledRequest {
    pub enabled: bool,
}

// ============================================================================
// Sensor Status Models
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityStatus {
    pub running: bool,
    pub near: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrightnessStatus {
    pub running: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorsStatus {
    pub proximity: ProximityStatus,
    pub brightness: BrightnessStatus,
}
