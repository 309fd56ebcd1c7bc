//! Typed event broadcasting.
//!
//! The EventBus is how a protocol client delivers inbound events to every
//! registered listener. Each subscriber gets its own receiver; dropping the
//! receiver unregisters it.
//!
//! # Example
//!
//! ```rust
//! use wcdemo_core::event_bus::EventBus;
//!
//! let bus: EventBus<String> = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.emit("session_delete".to_string());
//!
//! // In async context:
//! // let event = rx.recv().await.unwrap();
//! ```

use tokio::sync::broadcast;

/// Default channel capacity for the event bus.
/// Events beyond this capacity will cause slow subscribers to miss events (lag).
const DEFAULT_CAPACITY: usize = 256;

/// A broadcast channel of `T` with any number of subscribers.
pub struct EventBus<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> EventBus<T> {
    /// Create a new EventBus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new EventBus with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// If there are no subscribers, the event is dropped and 0 is returned.
    pub fn emit(&self, event: T) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all future events. Past events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Get the current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Proposal(u64),
        Delete(&'static str),
    }

    #[test]
    fn new_creates_bus() {
        let bus: EventBus<TestEvent> = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscribe_increments_count() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let _rx1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn dropped_subscriber_decrements_count() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn emit_returns_zero_with_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(TestEvent::Proposal(1)), 0);
    }

    #[test]
    fn clones_share_subscribers() {
        let bus = EventBus::new();
        let clone = bus.clone();
        let _rx = bus.subscribe();
        assert_eq!(clone.emit(TestEvent::Delete("t")), 1);
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(TestEvent::Proposal(1));
        bus.emit(TestEvent::Delete("t1"));

        assert_eq!(rx.recv().await.unwrap(), TestEvent::Proposal(1));
        assert_eq!(rx.recv().await.unwrap(), TestEvent::Delete("t1"));
    }

    #[tokio::test]
    async fn late_subscriber_misses_old_events() {
        let bus = EventBus::new();
        let mut early = bus.subscribe();
        bus.emit(TestEvent::Proposal(1));

        let mut late = bus.subscribe();
        bus.emit(TestEvent::Proposal(2));

        assert_eq!(early.recv().await.unwrap(), TestEvent::Proposal(1));
        assert_eq!(early.recv().await.unwrap(), TestEvent::Proposal(2));
        assert_eq!(late.recv().await.unwrap(), TestEvent::Proposal(2));
    }

    #[tokio::test]
    async fn slow_subscriber_experiences_lag() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();

        bus.emit(TestEvent::Proposal(1));
        bus.emit(TestEvent::Proposal(2));
        bus.emit(TestEvent::Proposal(3));

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap(), TestEvent::Proposal(2));
    }
}
