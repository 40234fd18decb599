//! Broadcast Dispatcher
//!
//! Hands a persisted message to every current subscriber. Each pass:
//!
//! 1. takes the publish-order lock (passes never interleave, so every
//!    subscriber sees messages in publish-call order)
//! 2. snapshots the registry and releases the registry lock
//! 3. `try_send`s to each member; a full buffer or a closed channel evicts
//!    that member instead of waiting on it
//!
//! The publisher therefore never blocks on a slow or stalled consumer, and
//! joins/leaves proceed while a pass is running.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

use super::registry::SubscriberRegistry;
use crate::store::Message;

/// Outcome of one publish pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscribers that accepted the message
    pub delivered: usize,
    /// Subscribers removed during this pass (buffer full or already gone)
    pub evicted: usize,
}

/// Fans published messages out to the subscriber registry
pub struct Dispatcher {
    registry: SubscriberRegistry,
    order: Mutex<()>,
}

impl Dispatcher {
    pub fn new(registry: SubscriberRegistry) -> Self {
        Self {
            registry,
            order: Mutex::new(()),
        }
    }

    /// Deliver `message` to every subscriber registered at this instant
    pub fn publish(&self, message: Message) -> DispatchReport {
        let message = Arc::new(message);
        let _order = self.order.lock();

        let members = self.registry.snapshot();
        let mut report = DispatchReport::default();

        for (id, sender) in members {
            match sender.try_send(Arc::clone(&message)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscriber_id = %id,
                        message_id = message.id,
                        "Subscriber buffer full, evicting slow consumer"
                    );
                    if self.registry.evict(&id) {
                        report.evicted += 1;
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber_id = %id, "Subscriber already closed");
                    if self.registry.evict(&id) {
                        report.evicted += 1;
                    }
                }
            }
        }

        tracing::debug!(
            message_id = message.id,
            delivered = report.delivered,
            evicted = report.evicted,
            "Published message"
        );

        report
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }
}
