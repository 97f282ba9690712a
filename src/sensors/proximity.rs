//! Presence detection loop
//!
//! Polls the proximity sensor through the device manager and raises
//! `approach`/`depart` events strictly on transitions. A failed read skips
//! the tick: no state change, no event.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::ProximityConfig;
use crate::device::DeviceManager;
use crate::models::EventKind;
use crate::notify::EventBus;

pub struct ProximityMonitor {
    manager: Arc<DeviceManager>,
    events: Arc<EventBus>,
    interval: Duration,
    /// Written only by the loop itself; the API reads it.
    last_near: RwLock<bool>,
    cancel: CancellationToken,
}

impl ProximityMonitor {
    pub fn new(manager: Arc<DeviceManager>, events: Arc<EventBus>, config: &ProximityConfig) -> Self {
        Self {
            manager,
            events,
            interval: Duration::from_millis(config.interval_ms),
            last_near: RwLock::new(false),
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

    /// Last presence reading the loop stored.
    pub async fn near(&self) -> bool {
        *self.last_near.read().await
    }

    /// Run the edge-detection loop until stopped.
    pub async fn start(self: Arc<Self>) {
        tracing::info!("Starting proximity monitor (interval {:?})", self.interval);

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Proximity monitor stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let near = match self.manager.read_proximity().await {
                Ok(near) => near,
                Err(e) => {
                    tracing::debug!("Proximity read failed, skipping tick: {}", e);
                    continue;
                }
            };

            let prev = {
                let mut last = self.last_near.write().await;
                std::mem::replace(&mut *last, near)
            };

            if near && !prev {
                self.events
                    .emit(EventKind::Approach, "Presence detected")
                    .await;
            } else if !near && prev {
                self.events.emit(EventKind::Depart, "Presence cleared").await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::MockTransport;
    use crate::error::DeviceError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAR_DUMP: &str =
        "Proximity Sensor: last 10 events\n  1 (ts=100.0) 5.0, 0.0, 0.0,\n";
    const NEAR_DUMP: &str =
        "Proximity Sensor: last 10 events\n  1 (ts=100.0) 0.0, 0.0, 0.0,\n";

    /// Transport that feeds one scripted proximity reading per tick and
    /// repeats the last entry once the script runs out. `None` entries
    /// simulate a failed read.
    fn scripted(script: Vec<Option<&'static str>>) -> MockTransport {
        let mut queue: VecDeque<Option<&'static str>> = script.into();
        MockTransport::with_handler(move |cmd| {
            assert!(cmd.ends_with("shell dumpsys sensorservice"), "cmd: {}", cmd);
            let entry = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                *queue.front().unwrap()
            };
            match entry {
                Some(dump) => MockTransport::ok(dump),
                None => Err(DeviceError::Transport("adb hiccup".to_string())),
            }
        })
    }

    fn monitor_with(mock: MockTransport) -> (Arc<ProximityMonitor>, Arc<EventBus>) {
        let manager = Arc::new(DeviceManager::new(
            Arc::new(mock),
            "192.168.1.50:35421".to_string(),
        ));
        let events = Arc::new(EventBus::new());
        let mut monitor = ProximityMonitor::new(
            manager,
            events.clone(),
            &ProximityConfig { interval_ms: 1000 },
        );
        monitor.interval = Duration::from_millis(10);
        (Arc::new(monitor), events)
    }

    #[tokio::test]
    async fn test_edges_fire_once_per_transition() {
        let script = vec![
            Some(FAR_DUMP),
            Some(FAR_DUMP),
            Some(NEAR_DUMP),
            Some(NEAR_DUMP),
            Some(FAR_DUMP),
        ];
        let (monitor, events) = monitor_with(scripted(script));

        let approaches = Arc::new(AtomicUsize::new(0));
        let counter = approaches.clone();
        events
            .subscribe(EventKind::Approach, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        let handle = tokio::spawn(monitor.clone().start());
        tokio::time::sleep(Duration::from_millis(200)).await;
        monitor.stop();
        let _ = handle.await;

        // One approach at the first near, one depart at the final far, and
        // nothing for the repeated identical readings
        let recents = events.recent(usize::MAX).await;
        let kinds: Vec<EventKind> = recents.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Depart, EventKind::Approach]);
        assert_eq!(approaches.load(Ordering::SeqCst), 1);
        assert!(!monitor.near().await);
    }

    #[tokio::test]
    async fn test_failed_reads_skip_without_state_change() {
        let script = vec![
            None,
            None,
            Some(NEAR_DUMP),
            None,
            Some(NEAR_DUMP),
            Some(FAR_DUMP),
        ];
        let (monitor, events) = monitor_with(scripted(script));

        let handle = tokio::spawn(monitor.clone().start());
        tokio::time::sleep(Duration::from_millis(200)).await;
        monitor.stop();
        let _ = handle.await;

        // Errors around the near readings neither fire events nor reset the
        // stored state, so the only edges are one approach and one depart
        let recents = events.recent(usize::MAX).await;
        let kinds: Vec<EventKind> = recents.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Depart, EventKind::Approach]);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (monitor, _events) = monitor_with(scripted(vec![Some(FAR_DUMP)]));

        let handle = tokio::spawn(monitor.clone().start());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(monitor.is_running());

        monitor.stop();
        monitor.stop();
        let _ = handle.await;
        assert!(!monitor.is_running());
    }
}
