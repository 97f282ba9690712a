//! Device manager
//!
//! Owns the device address and serializes every remote command behind a
//! single lock, so at most one command is in flight per device no matter how
//! many loops and API callers share the manager. Address and cached
//! readiness live behind a separate lock; reading them never waits on a
//! slow command.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::device::parse;
use crate::device::transport::{CommandOutput, CommandTransport};
use crate::error::DeviceError;
use crate::models::DeviceStatus;

/// Proximity readings below this distance (cm) count as "near".
const NEAR_THRESHOLD: f32 = 1.0;

struct ConnState {
    address: String,
    ready: bool,
}

pub struct DeviceManager {
    transport: Arc<dyn CommandTransport>,
    /// Serializes remote commands. Lock order: command_lock before state.
    command_lock: Mutex<()>,
    state: RwLock<ConnState>,
}

impl DeviceManager {
    pub fn new(transport: Arc<dyn CommandTransport>, address: String) -> Self {
        Self {
            transport,
            command_lock: Mutex::new(()),
            state: RwLock::new(ConnState {
                address,
                ready: false,
            }),
        }
    }

    /// Current `host:port` address (snapshot, no I/O).
    pub async fn address(&self) -> String {
        self.state.read().await.address.clone()
    }

    /// Host part of the current address.
    pub async fn host(&self) -> String {
        let address = self.address().await;
        match address.rsplit_once(':') {
            Some((host, _)) => host.to_string(),
            None => address,
        }
    }

    /// Last readiness the health loop observed. No I/O; may be stale.
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    pub(crate) async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    /// Live round-trip check against the device. Unlike `is_ready` this
    /// issues a real command and reports what the device says right now.
    pub async fn is_connected(&self) -> bool {
        match self.exec_device(&["get-state"]).await {
            Ok(output) => output.success && output.trimmed_stdout() == "device",
            Err(e) => {
                tracing::debug!("Live connection check failed: {}", e);
                false
            }
        }
    }

    /// Connect to the current address. Idempotent: an already-established
    /// session counts as success. Cached readiness is left to the health
    /// loop (or `set_address`) to update.
    pub async fn connect(&self) -> Result<(), DeviceError> {
        let _guard = self.command_lock.lock().await;
        let address = self.state.read().await.address.clone();
        self.try_connect(&address).await
    }

    /// Switch the managed device to a new address.
    ///
    /// Marks the state disconnected, drops the old session and connects to
    /// the new address. On failure the address rolls back to the previous
    /// value and a best-effort reconnect restores the old session, so the
    /// stored address always points at the last address that worked.
    pub async fn set_address(&self, new_address: &str) -> Result<(), DeviceError> {
        // Held across the whole swap: no command can interleave with an
        // address mutation
        let _guard = self.command_lock.lock().await;

        let old_address = {
            let mut state = self.state.write().await;
            state.ready = false;
            let old = state.address.clone();
            state.address = new_address.to_string();
            old
        };

        if old_address != new_address {
            let _ = self.transport.run(&["disconnect", &old_address]).await;
        }

        match self.try_connect(new_address).await {
            Ok(()) => {
                self.state.write().await.ready = true;
                tracing::info!("Device address set to {}", new_address);
                Ok(())
            }
            Err(e) => {
                self.state.write().await.address = old_address.clone();
                let restored = self.try_connect(&old_address).await.is_ok();
                self.state.write().await.ready = restored;
                tracing::warn!(
                    "Address change to {} failed ({}), rolled back to {}",
                    new_address,
                    e,
                    old_address
                );
                Err(e)
            }
        }
    }

    // ========================================================================
    // Actuators
    // ========================================================================

    pub async fn wake_screen(&self) -> Result<(), DeviceError> {
        self.shell(&["input", "keyevent", "KEYCODE_WAKEUP"]).await?;
        Ok(())
    }

    pub async fn sleep_screen(&self) -> Result<(), DeviceError> {
        self.shell(&["input", "keyevent", "KEYCODE_SLEEP"]).await?;
        Ok(())
    }

    /// Set the screen brightness; the requested level is clamped into
    /// [0, 255]. Returns the applied value.
    pub async fn set_brightness(&self, level: i64) -> Result<u8, DeviceError> {
        let clamped = level.clamp(0, 255) as u8;
        let value = clamped.to_string();
        self.shell(&["settings", "put", "system", "screen_brightness", &value])
            .await?;
        Ok(clamped)
    }

    pub async fn set_auto_brightness(&self, enabled: bool) -> Result<(), DeviceError> {
        let mode = if enabled { "1" } else { "0" };
        self.shell(&["settings", "put", "system", "screen_brightness_mode", mode])
            .await?;
        Ok(())
    }

    /// Set the screen-off timeout. The device stores milliseconds.
    pub async fn set_screen_timeout(&self, seconds: u64) -> Result<(), DeviceError> {
        let millis = seconds.saturating_mul(1000).to_string();
        self.shell(&["settings", "put", "system", "screen_off_timeout", &millis])
            .await?;
        Ok(())
    }

    // ========================================================================
    // Sensor reads
    // ========================================================================

    /// True when something is within the proximity sensor's near range.
    pub async fn read_proximity(&self) -> Result<bool, DeviceError> {
        let dump = self.shell(&["dumpsys", "sensorservice"]).await?;
        let distance = parse::first_sensor_value(&dump, "proximity")?;
        Ok(distance < NEAR_THRESHOLD)
    }

    /// Ambient light level in lux.
    pub async fn read_light_level(&self) -> Result<f32, DeviceError> {
        let dump = self.shell(&["dumpsys", "sensorservice"]).await?;
        parse::first_sensor_value(&dump, "light")
    }

    // ========================================================================
    // Status snapshot
    // ========================================================================

    /// Best-effort snapshot. When the device is unreachable this returns the
    /// all-zero snapshot with `connected: false` and no error; when
    /// connected, each sub-query failure leaves only its own field at zero.
    pub async fn get_status(&self) -> DeviceStatus {
        if !self.is_connected().await {
            return DeviceStatus::default();
        }

        let mut status = DeviceStatus {
            connected: true,
            ..DeviceStatus::default()
        };

        match self
            .shell(&["dumpsys", "battery"])
            .await
            .and_then(|dump| parse::parse_battery(&dump))
        {
            Ok(info) => {
                status.battery_level = info.level;
                status.battery_charging = info.charging;
            }
            Err(e) => tracing::debug!("Battery query failed: {}", e),
        }

        match self
            .shell(&["dumpsys", "power"])
            .await
            .and_then(|dump| parse::parse_screen_on(&dump))
        {
            Ok(on) => status.screen_on = on,
            Err(e) => tracing::debug!("Screen state query failed: {}", e),
        }

        match self
            .shell(&["settings", "get", "system", "screen_brightness"])
            .await
            .and_then(|raw| parse::parse_int(&raw))
        {
            Ok(level) => status.brightness = level,
            Err(e) => tracing::debug!("Brightness query failed: {}", e),
        }

        match self
            .shell(&["settings", "get", "system", "screen_off_timeout"])
            .await
            .and_then(|raw| parse::parse_int(&raw))
        {
            Ok(millis) => status.screen_timeout = (millis / 1000).max(0) as u64,
            Err(e) => tracing::debug!("Screen timeout query failed: {}", e),
        }

        match self
            .shell(&["dumpsys", "sensorservice"])
            .await
            .and_then(|dump| parse::first_sensor_value(&dump, "light"))
        {
            Ok(lux) => status.light_level = lux,
            Err(e) => tracing::debug!("Light level query failed: {}", e),
        }

        status
    }

    // ========================================================================
    // Command plumbing
    // ========================================================================

    /// Run the connect command. The connect exit status is unreliable, so
    /// success is judged from the output text. Callers hold the command lock.
    async fn try_connect(&self, address: &str) -> Result<(), DeviceError> {
        let output = self.transport.run(&["connect", address]).await?;
        let text = if output.stdout.trim().is_empty() {
            output.stderr.trim()
        } else {
            output.stdout.trim()
        };

        if parse::connect_succeeded(text) {
            Ok(())
        } else {
            Err(DeviceError::ConnectFailed {
                address: address.to_string(),
                reason: text.to_string(),
            })
        }
    }

    /// Run `<adb> -s <address> <tail…>` under the command lock.
    async fn exec_device(&self, tail: &[&str]) -> Result<CommandOutput, DeviceError> {
        let _guard = self.command_lock.lock().await;
        let address = self.state.read().await.address.clone();

        let mut args = vec!["-s", address.as_str()];
        args.extend_from_slice(tail);
        self.transport.run(&args).await
    }

    /// Run a shell command on the device and require a clean exit.
    async fn shell(&self, tail: &[&str]) -> Result<String, DeviceError> {
        let mut args = vec!["shell"];
        args.extend_from_slice(tail);

        let output = self.exec_device(&args).await?;
        if !output.success {
            return Err(DeviceError::CommandFailed {
                command: tail.join(" "),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}
