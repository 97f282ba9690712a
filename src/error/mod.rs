//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors raised by remote command execution against the device.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Command timed out: {command}")]
    Timeout { command: String },

    #[error("Command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Failed to connect to {address}: {reason}")]
    ConnectFailed { address: String, reason: String },

    #[error("Unexpected {what} output: {detail}")]
    Parse { what: &'static str, detail: String },
}

/// Errors raised by port rediscovery.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No open port on {host} in {start}-{end}")]
    NoOpenPort { host: String, start: u16, end: u16 },

    #[error("Port scan cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Device(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            AppError::Scan(ScanError::NoOpenPort { .. }) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::Scan(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
