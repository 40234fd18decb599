//! # Murmur
//!
//! A minimal real-time chat server. Users register, log in with a session
//! cookie, post messages, and receive every newly posted message live over
//! a server-sent event stream.
//!
//! ## Modules
//!
//! - [`broadcast`]: Subscriber registry, dispatcher and per-stream session loop
//! - [`auth`]: Password credentials and session tokens
//! - [`store`]: SQLite persistence for users and messages
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use murmur::{AppState, Config, Database};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let database = Arc::new(Database::open_in_memory()?);
//!
//!     let state = AppState::new(database, config);
//!     state
//!         .sessions
//!         .start_purge_task(state.config.sessions.purge_interval());
//!
//!     murmur::serve(state).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod broadcast;
pub mod config;
pub mod store;

// Re-export top-level types for convenience
pub use api::{build_router, serve, serve_with_shutdown, ApiError, AppState};

pub use auth::{AuthError, CredentialStore, SessionRegistry, SessionToken};

pub use broadcast::{
    BroadcastError, CloseReason, DispatchReport, Dispatcher, RegistryConfig, StreamSession,
    SubscriberId, SubscriberRegistry, Subscription,
};

pub use config::{Config, ConfigError};

pub use store::{Database, Message, MessageStore, StoreError, StoreResult, UserId, UserStore};
