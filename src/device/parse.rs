//! Parsers for device command output
//!
//! The device reports state as plain text dumps (`dumpsys`, `settings get`).
//! Everything here is line-oriented and tolerant of surrounding noise, but
//! a dump missing its expected shape is a `Parse` error so callers can skip
//! the tick instead of acting on garbage.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DeviceError;

/// Sensor event lines carry a parenthesized timestamp followed by
/// comma-separated float values, e.g. `1 (ts=1234.5) 5.0, 0.0, 0.0,`.
static SENSOR_EVENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([^()]*)\)\s*(-?\d+(?:\.\d+)?)").expect("Invalid sensor event regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct BatteryInfo {
    pub level: i64,
    pub charging: bool,
}

/// Parse a battery dump: `level:` is the charge percentage, `status:` values
/// 2 and 5 mean charging/full-on-charger. A dump without `level:` is
/// malformed; a missing `status:` is treated as not charging.
pub fn parse_battery(dump: &str) -> Result<BatteryInfo, DeviceError> {
    let mut level: Option<i64> = None;
    let mut charging = false;

    for line in dump.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("level:") {
            level = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("status:") {
            let status: i64 = rest.trim().parse().unwrap_or(0);
            charging = status == 2 || status == 5;
        }
    }

    match level {
        Some(level) => Ok(BatteryInfo { level, charging }),
        None => Err(DeviceError::Parse {
            what: "battery",
            detail: "no level: line in dump".to_string(),
        }),
    }
}

/// Extract the most recent reading of one sensor from a sensor-service dump.
///
/// The dump lists a section per sensor; event lines under a section header
/// carry a parenthesized timestamp and the reported values. Returns the
/// first value of the first event line after the first header mentioning
/// `sensor` (case-insensitive). Scanning stops at the next section header so
/// an empty section never borrows a neighbour's events.
pub fn first_sensor_value(dump: &str, sensor: &str) -> Result<f32, DeviceError> {
    let needle = sensor.to_lowercase();
    let mut in_section = false;

    for line in dump.lines() {
        if !in_section {
            if line.to_lowercase().contains(&needle) {
                in_section = true;
            }
            continue;
        }

        if let Some(caps) = SENSOR_EVENT_RE.captures(line) {
            let raw = &caps[2];
            return raw.parse().map_err(|_| DeviceError::Parse {
                what: "sensor",
                detail: format!("bad {} value: {}", sensor, raw),
            });
        }

        // Next sensor's header means this section had no events
        if line.to_lowercase().contains("events") {
            break;
        }
    }

    Err(DeviceError::Parse {
        what: "sensor",
        detail: format!("no {} events in dump", sensor),
    })
}

/// Parse a bare-integer `settings get` response. Unset settings come back as
/// the literal string `null`.
pub fn parse_int(raw: &str) -> Result<i64, DeviceError> {
    let trimmed = raw.trim();
    trimmed.parse().map_err(|_| DeviceError::Parse {
        what: "settings",
        detail: format!("not an integer: {:?}", trimmed),
    })
}

/// Screen power state from a power-manager dump (`mWakefulness=Awake`).
pub fn parse_screen_on(dump: &str) -> Result<bool, DeviceError> {
    for line in dump.lines() {
        if let Some(rest) = line.trim().strip_prefix("mWakefulness=") {
            return Ok(rest.trim() == "Awake");
        }
    }

    Err(DeviceError::Parse {
        what: "power",
        detail: "no mWakefulness= line in dump".to_string(),
    })
}

/// The connect command reports success in its output text; its exit status
/// is not reliable. Both "connected to" and "already connected to" count.
pub fn connect_succeeded(stdout: &str) -> bool {
    stdout.contains("connected to") && !stdout.contains("unable to connect")
}
