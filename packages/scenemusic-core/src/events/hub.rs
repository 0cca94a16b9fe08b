//! Subscription tracking for compositor notifications.
//!
//! - `EventHub`: fans each published event out to every live subscriber
//! - `Subscription`: RAII handle that unregisters itself when dropped

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::CompositorEvent;

/// Fan-out point for compositor notifications.
///
/// Every subscriber gets its own unbounded queue so a slow handler never
/// loses a state mutation; events are delivered in publish order.
pub struct EventHub {
    subscribers: DashMap<u64, mpsc::UnboundedSender<CompositorEvent>>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a subscriber and returns its handle.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(id, tx);
        log::debug!(
            "[Events] Subscription {} registered (total: {})",
            id,
            self.subscribers.len()
        );

        Subscription {
            id,
            hub: Arc::clone(self),
            rx,
        }
    }

    /// Delivers an event to every subscriber.
    pub fn publish(&self, event: CompositorEvent) {
        self.subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    /// Ends every subscription; their `recv` returns `None` afterwards.
    pub fn close(&self) {
        self.subscribers.clear();
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn unregister(&self, id: u64) {
        if self.subscribers.remove(&id).is_some() {
            log::debug!(
                "[Events] Subscription {} released (remaining: {})",
                id,
                self.subscribers.len()
            );
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a stream of compositor notifications.
///
/// Dropping the handle stops delivery, even if the owning task panics or
/// exits early.
pub struct Subscription {
    id: u64,
    hub: Arc<EventHub>,
    rx: mpsc::UnboundedReceiver<CompositorEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next event. Returns `None` once the hub is closed.
    pub async fn recv(&mut self) -> Option<CompositorEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}
