//! Event broadcast to subscribers.
//!
//! Events are persisted by the engine first and then pushed to connected
//! subscribers as JSON-RPC notifications. Each subscriber has an independent
//! buffer; a subscriber that falls behind skips the oldest events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rategate_types::{EventCategory, RateEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter. `None` matches every category.
    pub categories: Option<Vec<EventCategory>>,
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &RateEvent) -> bool {
        match self.categories {
            Some(ref categories) => categories.contains(&event.category()),
            None => true,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RateEvent>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: RateEvent) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<RateEvent> {
        self.sender.subscribe()
    }

    /// Number of events emitted since startup.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rategate_types::{Address, U256};

    #[test]
    fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(RateEvent::LatestRateUpdated {
            rate: U256::new(1_000_000_000_000_000_000),
            timestamp: 1000,
        });

        let event = rx.try_recv().expect("receive event");
        assert_eq!(event.name(), "LatestRateUpdated");
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(RateEvent::AlertInvalidRate {
            rate: U256::ZERO,
            timestamp: 1,
        });
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_event_filter_categories() {
        let filter = EventFilter {
            categories: Some(vec![EventCategory::Alert]),
        };

        let alert = RateEvent::AlertInvalidRate {
            rate: U256::ZERO,
            timestamp: 1000,
        };
        assert!(filter.matches(&alert));

        let config = RateEvent::UpdaterSet {
            updater: Address::from_low_u8(1),
            timestamp: 1000,
        };
        assert!(!filter.matches(&config));

        assert!(EventFilter::default().matches(&config));
    }
}
