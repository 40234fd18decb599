//! Stream Session Loop
//!
//! Bridges one subscriber's deliveries onto its HTTP response body.
//!
//! ```text
//! Open ──join──▶ Listening ──disconnect / write error / eviction / shutdown──▶ Closing
//!                  │   ▲
//!                  └───┘ delivery → render → write
//! ```
//!
//! The response body reads from the `outbound` channel. When the client goes
//! away hyper drops the body, the channel closes, and the loop observes it in
//! the same `select!` that waits for deliveries.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::registry::{SubscriberRegistry, Subscription};
use super::render::{event_frame, KEEP_ALIVE_FRAME};
use super::BroadcastError;
use crate::store::UserId;

/// Why a stream session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The response body was dropped
    ClientDisconnected,
    /// Writing a frame failed mid-stream
    WriteFailed,
    /// The dispatcher removed this subscriber
    Evicted,
    /// The server is shutting down
    Shutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CloseReason::ClientDisconnected => "client_disconnected",
            CloseReason::WriteFailed => "write_failed",
            CloseReason::Evicted => "evicted",
            CloseReason::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// A joined subscriber plus the outbound half of its response body
pub struct StreamSession {
    subscription: Subscription,
    outbound: mpsc::Sender<String>,
    user_id: UserId,
    keep_alive: Option<Duration>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl StreamSession {
    /// Join the registry and create the body channel for a new stream
    ///
    /// Returns the session and the receiver the response body reads from.
    pub fn open(
        registry: &SubscriberRegistry,
        user_id: UserId,
        outbound_buffer: usize,
    ) -> Result<(Self, mpsc::Receiver<String>), BroadcastError> {
        let subscription = registry.join()?;
        let (outbound, body) = mpsc::channel(outbound_buffer.max(1));

        let session = Self {
            subscription,
            outbound,
            user_id,
            keep_alive: None,
            shutdown: None,
        };
        Ok((session, body))
    }

    /// Send an SSE comment every `every` while idle. Zero disables.
    pub fn keep_alive(mut self, every: Duration) -> Self {
        self.keep_alive = (!every.is_zero()).then_some(every);
        self
    }

    /// End the session once `shutdown` turns `true`
    pub fn until_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Run until the client disconnects, a write fails, the subscriber is
    /// evicted or shutdown is signalled. The subscriber is unregistered
    /// before this returns.
    pub async fn run(self) -> CloseReason {
        let StreamSession {
            mut subscription,
            outbound,
            user_id,
            keep_alive,
            mut shutdown,
        } = self;
        let subscriber_id = subscription.id();

        let mut ticker = keep_alive.map(|every| {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        tracing::debug!(subscriber_id = %subscriber_id, user_id, "Stream listening");

        let reason = loop {
            tokio::select! {
                biased;

                _ = outbound.closed() => break CloseReason::ClientDisconnected,

                _ = shutdown_requested(&mut shutdown) => break CloseReason::Shutdown,

                delivery = subscription.recv() => match delivery {
                    Some(message) => {
                        if outbound.send(event_frame(&message)).await.is_err() {
                            break CloseReason::WriteFailed;
                        }
                    }
                    None => break CloseReason::Evicted,
                },

                _ = next_tick(&mut ticker) => {
                    if outbound.send(KEEP_ALIVE_FRAME.to_string()).await.is_err() {
                        break CloseReason::WriteFailed;
                    }
                }
            }
        };

        subscription.leave();
        tracing::info!(
            subscriber_id = %subscriber_id,
            user_id,
            reason = %reason,
            "Stream closed"
        );
        reason
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn shutdown_requested(shutdown: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = shutdown {
        if rx.wait_for(|stop| *stop).await.is_ok() {
            return;
        }
    }
    // No signal source, or its sender is gone
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::registry::RegistryConfig;
    use crate::broadcast::Dispatcher;
    use crate::store::Message;
    use chrono::Utc;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(SubscriberRegistry::new(RegistryConfig::default()))
    }

    fn message(id: i64, content: &str) -> Message {
        Message::new(id, "alice", content, Utc::now())
    }

    #[tokio::test]
    async fn test_delivery_written_as_event_frame() {
        let dispatcher = dispatcher();
        let (session, mut body) = StreamSession::open(dispatcher.registry(), 1, 4).unwrap();
        let task = tokio::spawn(session.run());

        dispatcher.publish(message(1, "hello"));

        let frame = body.recv().await.unwrap();
        assert!(frame.starts_with("event: newMessage\ndata: "));
        assert!(frame.contains("alice:$</span> hello"));

        drop(body);
        assert_eq!(task.await.unwrap(), CloseReason::ClientDisconnected);
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_unregisters_without_delivery() {
        let dispatcher = dispatcher();
        let (session, body) = StreamSession::open(dispatcher.registry(), 1, 4).unwrap();
        assert_eq!(dispatcher.registry().len(), 1);

        drop(body);
        assert_eq!(session.run().await, CloseReason::ClientDisconnected);
        assert!(dispatcher.registry().is_empty());

        assert_eq!(dispatcher.publish(message(1, "nobody")).delivered, 0);
    }

    #[tokio::test]
    async fn test_one_disconnect_does_not_affect_other_stream() {
        let dispatcher = dispatcher();
        let (gone, gone_body) = StreamSession::open(dispatcher.registry(), 1, 4).unwrap();
        let (stays, mut stays_body) = StreamSession::open(dispatcher.registry(), 2, 4).unwrap();

        let gone_task = tokio::spawn(gone.run());
        let stays_task = tokio::spawn(stays.run());

        drop(gone_body);
        assert_eq!(gone_task.await.unwrap(), CloseReason::ClientDisconnected);

        let report = dispatcher.publish(message(1, "still here"));
        assert_eq!(report.delivered, 1);
        assert!(stays_body.recv().await.unwrap().contains("still here"));

        drop(stays_body);
        stays_task.await.unwrap();
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    async fn test_eviction_ends_session() {
        let dispatcher = dispatcher();
        let (session, mut body) = StreamSession::open(dispatcher.registry(), 1, 4).unwrap();
        let id = dispatcher.registry().snapshot()[0].0;

        let task = tokio::spawn(session.run());
        dispatcher.publish(message(1, "last"));
        dispatcher.registry().evict(&id);

        assert!(body.recv().await.unwrap().contains("last"));
        assert_eq!(task.await.unwrap(), CloseReason::Evicted);
    }

    #[tokio::test]
    async fn test_keep_alive_frames() {
        let dispatcher = dispatcher();
        let (session, mut body) = StreamSession::open(dispatcher.registry(), 1, 4).unwrap();
        let task = tokio::spawn(session.keep_alive(Duration::from_millis(10)).run());

        assert_eq!(body.recv().await.unwrap(), KEEP_ALIVE_FRAME);

        drop(body);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_ends_session() {
        let dispatcher = dispatcher();
        let (stop, stop_rx) = watch::channel(false);
        let (session, mut body) = StreamSession::open(dispatcher.registry(), 1, 4).unwrap();
        let task = tokio::spawn(session.until_shutdown(stop_rx).run());

        stop.send_replace(true);

        assert_eq!(task.await.unwrap(), CloseReason::Shutdown);
        assert!(body.recv().await.is_none());
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_keeps_session_open() {
        let dispatcher = dispatcher();
        let (stop, stop_rx) = watch::channel(false);
        let (session, mut body) = StreamSession::open(dispatcher.registry(), 1, 4).unwrap();
        let task = tokio::spawn(session.until_shutdown(stop_rx).run());

        drop(stop);
        dispatcher.publish(message(1, "still open"));
        assert!(body.recv().await.unwrap().contains("still open"));

        drop(body);
        assert_eq!(task.await.unwrap(), CloseReason::ClientDisconnected);
    }

    #[tokio::test]
    async fn test_registry_full() {
        let registry = SubscriberRegistry::new(RegistryConfig {
            max_subscribers: 1,
            subscriber_buffer: 4,
        });
        let _first = StreamSession::open(&registry, 1, 4).unwrap();

        let result = StreamSession::open(&registry, 2, 4);
        assert!(matches!(result, Err(BroadcastError::TooManySubscribers { .. })));
    }
}
