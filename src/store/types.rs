//! Core store types
//!
//! Plain data carried between the store, the broadcast engine and the
//! HTTP layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Database identifier of a registered user
pub type UserId = i64;

/// A persisted chat message
///
/// Immutable once constructed. Produced by the store and shared with every
/// stream subscriber behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Row id assigned by the store
    pub id: i64,
    /// Author's username at the time the message was read
    pub username: String,
    /// Message text as submitted (unescaped)
    pub content: String,
    /// When the store accepted the message
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        id: i64,
        username: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            content: content.into(),
            created_at,
        }
    }
}

/// Stored credential material for one user
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: UserId,
    /// Base64 SHA-256 digest of password ‖ salt
    pub password_hash: String,
    /// Base64 random salt
    pub salt: String,
}
