//! Murmur Store
//!
//! Persistence collaborators consumed by the chat core:
//!
//! - **types**: `Message`, `UserCredentials`, `UserId`
//! - **database**: SQLite implementation of both store traits
//! - **error**: Error types
//!
//! The broadcast engine never talks to SQLite directly. It receives fully
//! persisted `Message` values; a message that failed to persist is never
//! published.

pub mod database;
pub mod error;
pub mod types;

pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use types::{Message, UserCredentials, UserId};

use async_trait::async_trait;

/// Credential persistence used by the credential store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; fails with `StoreError::Conflict` if the name is taken
    async fn insert_user(&self, username: &str, password_hash: &str, salt: &str)
        -> StoreResult<UserId>;

    /// Fetch digest and salt for a username
    async fn find_credentials(&self, username: &str) -> StoreResult<Option<UserCredentials>>;
}

/// Message persistence used by the chat routes
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message and return it with its assigned id and timestamp
    async fn persist_message(&self, user_id: UserId, content: &str) -> StoreResult<Message>;

    /// Best-effort username lookup; empty string on a miss
    async fn lookup_username(&self, user_id: UserId) -> String;

    /// Most recent messages first
    async fn recent_messages(&self, limit: usize) -> StoreResult<Vec<Message>>;
}
