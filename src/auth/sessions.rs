//! Session Registry
//!
//! Maps opaque session tokens to user ids. Tokens are 256 bits from the OS
//! RNG, base64url encoded. Entries expire `ttl` after issuance; expired
//! entries are invisible to `lookup` and removed by `purge_expired`.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::AuthError;
use crate::store::UserId;

/// Cookie carrying the session token unless configured otherwise
pub const DEFAULT_COOKIE_NAME: &str = "session_id";

const TOKEN_BYTES: usize = 32;

/// Opaque session token handed to the browser
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

struct SessionEntry {
    user_id: UserId,
    issued_at: Instant,
}

/// Thread-safe token → user mapping
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
    cookie_name: String,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self::with_cookie_name(ttl, DEFAULT_COOKIE_NAME)
    }

    pub fn with_cookie_name(ttl: Duration, cookie_name: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            cookie_name: cookie_name.into(),
        }
    }

    /// Issue a new session for `user_id`
    pub fn create(&self, user_id: UserId) -> SessionToken {
        let token = SessionToken::generate();
        let entry = SessionEntry {
            user_id,
            issued_at: Instant::now(),
        };

        self.sessions.write().insert(token.0.clone(), entry);
        tracing::debug!(user_id, "Session created");
        token
    }

    /// Resolve a token to its user, if the session exists and has not expired
    pub fn lookup(&self, token: &str) -> Option<UserId> {
        let sessions = self.sessions.read();
        sessions
            .get(token)
            .filter(|entry| entry.issued_at.elapsed() < self.ttl)
            .map(|entry| entry.user_id)
    }

    /// Authenticate a request from its session cookie
    pub fn authenticate_request(&self, headers: &HeaderMap) -> Result<UserId, AuthError> {
        let jar = CookieJar::from_headers(headers);
        let cookie = jar.get(&self.cookie_name).ok_or(AuthError::Unauthenticated)?;
        self.lookup(cookie.value()).ok_or(AuthError::Unauthenticated)
    }

    /// Remove a session (logout). Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        let removed = self.sessions.write().remove(token);
        if let Some(entry) = &removed {
            tracing::debug!(user_id = entry.user_id, "Session revoked");
        }
        removed.is_some()
    }

    /// Drop every expired session, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.issued_at.elapsed() < self.ttl);
        before - sessions.len()
    }

    /// Start the background task that periodically purges expired sessions
    pub fn start_purge_task(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);

            loop {
                ticker.tick().await;

                let purged = registry.purge_expired();
                if purged > 0 {
                    tracing::info!(purged, remaining = registry.len(), "Purged expired sessions");
                }
            }
        })
    }

    /// Number of stored sessions, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}
