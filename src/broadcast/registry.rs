//! Subscriber Registry
//!
//! Tracks every open live-update stream. Each subscriber owns a bounded
//! channel; the registry keeps the sending half keyed by `SubscriberId`.
//!
//! A `Subscription` unregisters itself when dropped, so a stream that ends
//! on any path (normal close, write error, task abort) never leaks its entry.
//! `leave` consumes the handle, which makes a second removal of the same
//! subscriber unrepresentable.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::BroadcastError;
use crate::store::Message;

/// Unique identifier for one stream connection
pub type SubscriberId = Uuid;

/// Sending half held by the registry and cloned into dispatch snapshots
pub type Delivery = mpsc::Sender<Arc<Message>>;

/// Configuration for the subscriber registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of concurrently registered subscribers
    pub max_subscribers: usize,
    /// Pending deliveries a subscriber may buffer before it is evicted
    pub subscriber_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_subscribers: 1000,
            subscriber_buffer: 64,
        }
    }
}

struct Inner {
    members: Mutex<HashMap<SubscriberId, Delivery>>,
    config: RegistryConfig,
}

impl Inner {
    fn remove(&self, id: &SubscriberId) -> bool {
        let removed = self.members.lock().remove(id).is_some();
        if removed {
            tracing::info!(subscriber_id = %id, "Subscriber left");
        }
        removed
    }
}

/// Thread-safe set of connected subscribers
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<Inner>,
}

impl SubscriberRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                members: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Register a new subscriber
    ///
    /// Returns the receiving handle, or an error once the subscriber limit
    /// has been reached.
    pub fn join(&self) -> Result<Subscription, BroadcastError> {
        let capacity = self.inner.config.subscriber_buffer.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let id = Uuid::new_v4();

        {
            let mut members = self.inner.members.lock();
            if members.len() >= self.inner.config.max_subscribers {
                return Err(BroadcastError::TooManySubscribers {
                    limit: self.inner.config.max_subscribers,
                });
            }
            members.insert(id, sender);
        }

        tracing::info!(subscriber_id = %id, "Subscriber joined");
        Ok(Subscription {
            id,
            receiver,
            registry: Arc::clone(&self.inner),
        })
    }

    /// Unregister a subscriber
    pub fn leave(&self, subscription: Subscription) {
        subscription.leave();
    }

    /// Point-in-time copy of the membership
    ///
    /// Joins and leaves after the copy is taken are not reflected in it.
    pub fn snapshot(&self) -> Vec<(SubscriberId, Delivery)> {
        self.inner
            .members
            .lock()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect()
    }

    /// Forcibly remove a subscriber (slow or gone). Its stream observes the
    /// closed channel once it has drained what was already buffered.
    pub fn evict(&self, id: &SubscriberId) -> bool {
        self.inner.remove(id)
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.inner.members.lock().contains_key(id)
    }

    /// Get the current subscriber count
    pub fn len(&self) -> usize {
        self.inner.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }
}

/// One subscriber's delivery endpoint
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<Message>>,
    registry: Arc<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next delivery. `None` once the subscriber was evicted
    /// and its buffer is drained.
    pub async fn recv(&mut self) -> Option<Arc<Message>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Arc<Message>, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Unregister and release the endpoint
    pub fn leave(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
