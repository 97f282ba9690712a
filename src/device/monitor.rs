//! Connection health loop
//!
//! Live-checks the device on a fixed interval, reconnects when the link
//! drops, and after repeated reconnect failures scans the host for a moved
//! remote-control port. Nothing here is fatal; every failure is retried at
//! the next tick.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{MonitorConfig, ScannerConfig};
use crate::device::DeviceManager;
use crate::error::AppError;
use crate::models::EventKind;
use crate::notify::EventBus;
use crate::scanner;

pub struct ConnectionMonitor {
    manager: Arc<DeviceManager>,
    events: Arc<EventBus>,
    interval: Duration,
    failure_threshold: u32,
    rediscovery_cooldown: Duration,
    scanner_config: ScannerConfig,
    cancel: CancellationToken,
    scan_attempts: AtomicU32,
}

impl ConnectionMonitor {
    pub fn new(
        manager: Arc<DeviceManager>,
        events: Arc<EventBus>,
        config: &MonitorConfig,
        scanner_config: ScannerConfig,
    ) -> Self {
        Self {
            manager,
            events,
            interval: Duration::from_secs(config.interval_secs),
            failure_threshold: config.failure_threshold,
            rediscovery_cooldown: Duration::from_secs(config.rediscovery_cooldown_secs),
            scanner_config,
            cancel: CancellationToken::new(),
            scan_attempts: AtomicU32::new(0),
        }
    }

    /// Stop the loop before its next tick. Safe to call any number of times.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[cfg(test)]
    pub(crate) fn scan_attempts(&self) -> u32 {
        self.scan_attempts.load(Ordering::Relaxed)
    }

    /// Run the health loop until stopped.
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "Starting connection monitor (interval {:?}, threshold {}, cooldown {:?})",
            self.interval,
            self.failure_threshold,
            self.rediscovery_cooldown
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut consecutive_failures: u32 = 0;
        let mut down = false;
        let mut last_rediscovery: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Connection monitor stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if self.manager.is_connected().await {
                self.manager.set_ready(true).await;
                if down {
                    down = false;
                    self.events
                        .emit(
                            EventKind::Reconnected,
                            format!("Device reachable again at {}", self.manager.address().await),
                        )
                        .await;
                }
                consecutive_failures = 0;
                continue;
            }

            self.manager.set_ready(false).await;
            down = true;

            match self.manager.connect().await {
                Ok(()) => {
                    self.manager.set_ready(true).await;
                    down = false;
                    consecutive_failures = 0;
                    self.events
                        .emit(
                            EventKind::Reconnected,
                            format!("Reconnected to {}", self.manager.address().await),
                        )
                        .await;
                    continue;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        "Reconnect failed: {} (consecutive failures = {})",
                        e,
                        consecutive_failures
                    );
                }
            }

            if consecutive_failures < self.failure_threshold {
                continue;
            }

            // Rediscovery is rate-limited regardless of how long the outage
            // lasts; the attempt itself starts the cooldown window
            let cooled_down = last_rediscovery
                .map(|at| at.elapsed() >= self.rediscovery_cooldown)
                .unwrap_or(true);
            if !cooled_down {
                continue;
            }
            last_rediscovery = Some(Instant::now());

            match self.run_rediscovery().await {
                Ok(port) => {
                    down = false;
                    consecutive_failures = 0;
                    self.events
                        .emit(
                            EventKind::Reconnected,
                            format!("Recovered via port rediscovery on port {}", port),
                        )
                        .await;
                }
                Err(e) => tracing::warn!("Port rediscovery failed: {}", e),
            }
        }
    }

    /// Scan the device host for a live remote-control port and switch the
    /// manager to it. Shared by the loop and the manual API trigger; the
    /// manual path deliberately skips the loop's cooldown.
    pub async fn run_rediscovery(&self) -> Result<u16, AppError> {
        let host = self.manager.host().await;
        let attempt = self.scan_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("Port rediscovery attempt #{} on {}", attempt, host);

        let port = scanner::scan_for_port(&self.scanner_config, &host, &self.cancel).await?;
        let address = format!("{}:{}", host, port);
        self.manager.set_address(&address).await?;
        Ok(port)
    }
}
