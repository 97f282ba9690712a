//! Adaptive brightness loop
//!
//! Polls the ambient-light sensor and maps the reading onto the configured
//! brightness span with a clamped-linear ramp. The loop can be toggled at
//! runtime; the flag is read at the start of every tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::BrightnessConfig;
use crate::device::DeviceManager;

/// Illuminance at or above this maps to maximum brightness. The ramp is
/// linear across the 0..FULL_SCALE_LUX window.
const FULL_SCALE_LUX: f32 = 1000.0;

/// Map an illuminance reading onto `[min_level, max_level]`.
///
/// Zero or negative lux maps to `min_level`; `FULL_SCALE_LUX` and above map
/// to `max_level`; in between the ramp is linear.
pub fn lux_to_brightness(lux: f32, min_level: u8, max_level: u8) -> u8 {
    if max_level <= min_level {
        return min_level;
    }
    if lux <= 0.0 {
        return min_level;
    }

    let ratio = (lux / FULL_SCALE_LUX).min(1.0);
    let span = (max_level - min_level) as f32;
    let level = min_level as f32 + ratio * span;
    (level.round() as i64).clamp(min_level as i64, max_level as i64) as u8
}

pub struct BrightnessController {
    manager: Arc<DeviceManager>,
    interval: Duration,
    min_level: u8,
    max_level: u8,
    enabled: RwLock<bool>,
    cancel: CancellationToken,
}

impl BrightnessController {
    pub fn new(manager: Arc<DeviceManager>, config: &BrightnessConfig) -> Self {
        Self {
            manager,
            interval: Duration::from_secs(config.interval_secs),
            min_level: config.min_level,
            max_level: config.max_level,
            enabled: RwLock::new(config.enabled),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the loop before its next tick. Safe to call any number of times.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub async fn is_enabled(&self) -> bool {
        *self.enabled.read().await
    }

    /// Toggle the controller. Takes effect on the next tick, not mid-tick.
    pub async fn set_enabled(&self, enabled: bool) {
        *self.enabled.write().await = enabled;
        tracing::info!(
            "Adaptive brightness {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Run the brightness loop until stopped. Individual tick failures are
    /// logged and retried at the next tick.
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "Starting brightness controller (interval {:?}, levels {}-{})",
            self.interval,
            self.min_level,
            self.max_level
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Brightness controller stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if !*self.enabled.read().await {
                continue;
            }

            let lux = match self.manager.read_light_level().await {
                Ok(lux) => lux,
                Err(e) => {
                    tracing::debug!("Light read failed, skipping tick: {}", e);
                    continue;
                }
            };

            let level = lux_to_brightness(lux, self.min_level, self.max_level);
            match self.manager.set_brightness(level as i64).await {
                Ok(applied) => {
                    tracing::debug!("Applied brightness {} for {:.0} lux", applied, lux)
                }
                Err(e) => tracing::debug!("Brightness apply failed: {}", e),
            }
        }
    }
}
