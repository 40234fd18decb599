//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (database reachable)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 once the database answers a trivial query.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.database.ping() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database_ok = state.database.ping();
    let users = state
        .database
        .user_count()
        .map_err(|e| tracing::warn!(error = %e, "Failed to count users"))
        .ok();

    Json(HealthResponse {
        status: if database_ok { "healthy" } else { "unhealthy" }.to_string(),
        database: if database_ok { "ok" } else { "error" }.to_string(),
        subscribers: state.subscribers().len(),
        sessions: state.sessions.len(),
        users,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
