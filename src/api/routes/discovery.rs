//! Federation Discovery Routes
//!
//! - GET /.well-known/matrix/client
//! - GET /.well-known/matrix/server
//!
//! Both answer 404 unless the matching `[discovery]` value is configured.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /.well-known/matrix/client
pub async fn matrix_client(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let base_url = state
        .config
        .discovery
        .matrix_homeserver
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("matrix client discovery".to_string()))?;

    Ok((
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(json!({ "m.homeserver": { "base_url": base_url } })),
    )
        .into_response())
}

/// GET /.well-known/matrix/server
pub async fn matrix_server(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let server = state
        .config
        .discovery
        .matrix_server
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("matrix server discovery".to_string()))?;

    Ok(Json(json!({ "m.server": server })).into_response())
}
