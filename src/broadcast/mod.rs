//! Real-Time Broadcast
//!
//! In-process publish/subscribe for new chat messages, pushed to browsers
//! as server-sent events.
//!
//! ## Architecture
//!
//! - **SubscriberRegistry**: the set of open streams, one bounded delivery
//!   channel each
//! - **Dispatcher**: delivers a persisted message to every registered
//!   subscriber without waiting on any of them
//! - **StreamSession**: per-connection loop from deliveries to the response
//!   body
//! - **render**: HTML line and SSE frame formatting
//!
//! ## Flow
//!
//! ```text
//! POST /send ─▶ store ─▶ Dispatcher::publish ─▶ Subscription (×N) ─▶ StreamSession ─▶ client
//! ```

mod dispatcher;
mod registry;
pub mod render;
mod stream;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use registry::{RegistryConfig, SubscriberId, SubscriberRegistry, Subscription};
pub use stream::{CloseReason, StreamSession};

use thiserror::Error;

/// Errors that can occur when opening a stream
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Too many subscribers (limit: {limit})")]
    TooManySubscribers { limit: usize },
}
