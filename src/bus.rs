use tokio::sync::broadcast;
use tracing::debug;

use crate::events::Event;

/// Fan-out channel carrying [`Event`]s to external listeners (UI, API layer).
///
/// Thin wrapper over a tokio broadcast channel: every subscriber sees every
/// event, in publish order. Slow subscribers lag and drop the oldest events
/// rather than blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publishes an event, returning how many subscribers received it.
    pub fn publish(&self, event: Event) -> Result<usize, broadcast::error::SendError<Event>> {
        self.tx.send(event)
    }

    /// Publishes without treating "no subscribers" as a failure. The engine
    /// keeps running whether or not anything is listening.
    pub fn publish_lossy(&self, event: Event) {
        if self.tx.send(event).is_err() {
            debug!("event dropped: no active subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
