//! Application State
//!
//! Shared state accessible by all handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::auth::{CredentialStore, SessionRegistry};
use crate::broadcast::{Dispatcher, SubscriberRegistry};
use crate::config::Config;
use crate::store::{Database, MessageStore};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// SQLite store (health checks, user persistence)
    pub database: Arc<Database>,
    /// Message persistence consumed by the chat routes
    pub messages: Arc<dyn MessageStore>,
    /// Password registration and verification
    pub credentials: Arc<CredentialStore>,
    /// Session token registry
    pub sessions: Arc<SessionRegistry>,
    /// Broadcast dispatcher (owns the subscriber registry)
    pub dispatcher: Arc<Dispatcher>,
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// Flips to `true` when the server begins shutting down
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Create state backed entirely by one SQLite database
    pub fn new(database: Arc<Database>, config: Config) -> Self {
        let messages: Arc<dyn MessageStore> = database.clone();
        Self::with_message_store(database, messages, config)
    }

    /// Create state with a separate message store
    pub fn with_message_store(
        database: Arc<Database>,
        messages: Arc<dyn MessageStore>,
        config: Config,
    ) -> Self {
        let credentials = Arc::new(CredentialStore::new(database.clone()));
        let sessions = Arc::new(SessionRegistry::with_cookie_name(
            config.sessions.ttl(),
            config.sessions.cookie_name.clone(),
        ));
        let registry = SubscriberRegistry::new(config.broadcast.registry_config());
        let dispatcher = Arc::new(Dispatcher::new(registry));

        Self {
            database,
            messages,
            credentials,
            sessions,
            dispatcher,
            config: Arc::new(config),
            start_time: Instant::now(),
            shutdown: Arc::new(watch::channel(false).0),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn subscribers(&self) -> &SubscriberRegistry {
        self.dispatcher.registry()
    }

    /// Receiver that long-lived streams watch to end on shutdown
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Tell every open stream to close
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
        tracing::info!(
            open_streams = self.subscribers().len(),
            "Closing event streams"
        );
    }
}
