//! Device event notifications
//!
//! Observers register per event kind and run synchronously in the loop that
//! emits the event, so a slow observer delays that loop's next tick. A
//! bounded ring of recent events backs the `/api/events` endpoint.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{DeviceEvent, EventKind};

/// Maximum number of events kept in the recent ring.
const RECENT_CAPACITY: usize = 100;

type Observer = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

pub struct EventBus {
    observers: RwLock<HashMap<EventKind, Vec<(Uuid, Observer)>>>,
    recent: RwLock<VecDeque<DeviceEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            recent: RwLock::new(VecDeque::with_capacity(RECENT_CAPACITY)),
        }
    }

    /// Register an observer for one event kind. Returns a handle usable with
    /// `unsubscribe`.
    #[allow(dead_code)]
    pub async fn subscribe<F>(&self, kind: EventKind, observer: F) -> Uuid
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let mut observers = self.observers.write().await;
        observers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(observer)));
        id
    }

    /// Remove a previously registered observer. Returns false if the handle
    /// is unknown.
    #[allow(dead_code)]
    pub async fn unsubscribe(&self, id: Uuid) -> bool {
        let mut observers = self.observers.write().await;
        let mut removed = false;
        for list in observers.values_mut() {
            let before = list.len();
            list.retain(|(obs_id, _)| *obs_id != id);
            removed |= list.len() != before;
        }
        removed
    }

    /// Record an event and deliver it to every observer of its kind.
    pub async fn emit(&self, kind: EventKind, message: impl Into<String>) {
        let event = DeviceEvent {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        };

        tracing::info!("Device event {:?}: {}", kind, event.message);

        {
            let mut recent = self.recent.write().await;
            if recent.len() == RECENT_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(event.clone());
        }

        // Snapshot the observer list so delivery runs without the lock held
        let targets: Vec<Observer> = {
            let observers = self.observers.read().await;
            observers
                .get(&kind)
                .map(|list| list.iter().map(|(_, obs)| obs.clone()).collect())
                .unwrap_or_default()
        };

        for observer in targets {
            observer(&event);
        }
    }

    /// Most-recent-first snapshot of the event ring.
    pub async fn recent(&self, limit: usize) -> Vec<DeviceEvent> {
        let recent = self.recent.read().await;
        recent.iter().rev().take(limit).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_emit_delivers_to_matching_kind_only() {
        let bus = EventBus::new();
        let approaches = Arc::new(AtomicUsize::new(0));
        let departs = Arc::new(AtomicUsize::new(0));

        let a = approaches.clone();
        bus.subscribe(EventKind::Approach, move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        let d = departs.clone();
        bus.subscribe(EventKind::Depart, move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        bus.emit(EventKind::Approach, "someone walked up").await;
        bus.emit(EventKind::Approach, "someone walked up").await;
        bus.emit(EventKind::Depart, "left").await;

        assert_eq!(approaches.load(Ordering::SeqCst), 2);
        assert_eq!(departs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_same_kind() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let c = count.clone();
            bus.subscribe(EventKind::Reconnected, move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }

        bus.emit(EventKind::Reconnected, "back").await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let id = bus
            .subscribe(EventKind::Approach, move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        bus.emit(EventKind::Approach, "first").await;
        assert!(bus.unsubscribe(id).await);
        bus.emit(EventKind::Approach, "second").await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.unsubscribe(id).await);
    }

    #[tokio::test]
    async fn test_recent_ring_caps_and_orders() {
        let bus = EventBus::new();
        for i in 0..(RECENT_CAPACITY + 5) {
            bus.emit(EventKind::Approach, format!("event {}", i)).await;
        }

        let all = bus.recent(usize::MAX).await;
        assert_eq!(all.len(), RECENT_CAPACITY);
        // Newest first, oldest five dropped
        assert_eq!(all[0].message, format!("event {}", RECENT_CAPACITY + 4));
        assert_eq!(all.last().map(|e| e.message.as_str()), Some("event 5"));

        let two = bus.recent(2).await;
        assert_eq!(two.len(), 2);
    }
}
