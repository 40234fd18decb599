//! Request extractors

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::Redirect,
};
use std::sync::Arc;

use super::state::AppState;
use crate::store::UserId;

/// The user behind a valid session cookie
///
/// Rejects with a `303 See Other` to `/login` when the cookie is missing,
/// unknown or expired.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state
            .sessions
            .authenticate_request(&parts.headers)
            .map(AuthUser)
            .map_err(|_| {
                tracing::debug!(path = %parts.uri.path(), "Unauthenticated request, redirecting");
                Redirect::to("/login")
            })
    }
}
