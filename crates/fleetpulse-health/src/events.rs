//! Subscriber fan-out for service updates.
//!
//! Each observer gets its own bounded queue; broadcast walks the set under
//! the shared lock and uses `try_send` so a stalled observer costs dropped
//! events, never a blocked monitor. Dropping a [`Subscription`] removes its
//! queue from the set, which closes it exactly once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

use fleetpulse_registry::ServiceUpdate;

/// Queue depth per subscriber; overflow drops the update for that observer.
pub const SUBSCRIBER_CAPACITY: usize = 50;

/// The set of live subscriber queues.
#[derive(Default)]
pub struct UpdateBus {
    subscribers: RwLock<HashMap<u64, mpsc::Sender<ServiceUpdate>>>,
    next_id: AtomicU64,
}

/// A live subscription; drop it to unsubscribe.
pub struct Subscription {
    id: u64,
    bus: Arc<UpdateBus>,
    rx: mpsc::Receiver<ServiceUpdate>,
}

impl UpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber queue.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        debug!(subscriber = id, "subscriber attached");
        Subscription {
            id,
            bus: Arc::clone(self),
            rx,
        }
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Send an update to every subscriber without blocking.
    ///
    /// Returns how many queues accepted the update; full queues drop it.
    pub fn broadcast(&self, update: &ServiceUpdate) -> usize {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        for (id, tx) in subscribers.iter() {
            match tx.try_send(update.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!(subscriber = *id, service = %update.id, "subscriber queue full, update dropped");
                }
                // A closed queue belongs to a subscription mid-drop; its
                // entry is removed by the Drop impl.
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    fn remove(&self, id: u64) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        debug!(subscriber = id, "subscriber detached");
    }
}

impl Subscription {
    /// Receive the next update; `None` once the bus side is gone.
    pub async fn recv(&mut self) -> Option<ServiceUpdate> {
        self.rx.recv().await
    }

    /// Non-blocking receive, for draining in tests and shutdown paths.
    pub fn try_recv(&mut self) -> Option<ServiceUpdate> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.remove(self.id);
    }
}
