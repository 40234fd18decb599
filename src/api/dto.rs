//! Data Transfer Objects
//!
//! Form bodies accepted by the HTML endpoints and JSON bodies returned by
//! the health endpoints.

use serde::{Deserialize, Serialize};

// ============================================
// AUTH DTOs
// ============================================

/// Login and registration form
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ============================================
// CHAT DTOs
// ============================================

/// Message submission form
#[derive(Debug, Deserialize)]
pub struct SendMessageForm {
    #[serde(default)]
    pub content: String,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    /// "ok" or "error"
    pub database: String,
    /// Open live-update streams
    pub subscribers: usize,
    /// Stored sessions
    pub sessions: usize,
    /// Registered accounts; null when the count query fails
    pub users: Option<u64>,
    pub uptime_seconds: u64,
    pub version: String,
}
