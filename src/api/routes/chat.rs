//! Chat Routes
//!
//! - GET / - Chat page with recent history
//! - POST /send - Persist a message and broadcast it to open streams

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    Form,
};
use std::sync::Arc;

use crate::api::dto::SendMessageForm;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::AuthUser;
use crate::api::pages;
use crate::api::state::AppState;

/// GET /
pub async fn index(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Html<String>> {
    let username = state.messages.lookup_username(user_id).await;
    let history = state
        .messages
        .recent_messages(state.config.chat.history_limit)
        .await?;

    Ok(Html(pages::index_page(&username, &history)))
}

/// POST /send
///
/// The message is published only after it has been stored; a storage
/// failure answers 500 and reaches no subscriber.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Form(form): Form<SendMessageForm>,
) -> ApiResult<StatusCode> {
    validate_content(&form.content, state.config.chat.max_message_len)?;

    let message = state
        .messages
        .persist_message(user_id, &form.content)
        .await
        .map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to persist message");
            ApiError::Store(e)
        })?;

    let report = state.dispatcher.publish(message);
    tracing::debug!(
        user_id,
        delivered = report.delivered,
        evicted = report.evicted,
        "Message sent"
    );

    Ok(StatusCode::OK)
}

fn validate_content(content: &str, max_len: usize) -> ApiResult<()> {
    if content.trim().is_empty() {
        return Err(ApiError::Validation("Message is empty".to_string()));
    }
    if content.chars().count() > max_len {
        return Err(ApiError::Validation(format!(
            "Message exceeds {} characters",
            max_len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content() {
        assert!(validate_content("hello", 10).is_ok());
        assert!(validate_content("", 10).is_err());
        assert!(validate_content(" \t\n", 10).is_err());
        assert!(validate_content("ünïcödé", 7).is_ok());
        assert!(validate_content("elevenchars", 10).is_err());
    }
}
