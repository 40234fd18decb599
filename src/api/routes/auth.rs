//! Auth Routes
//!
//! - GET/POST /register - Create an account
//! - GET/POST /login - Start a session
//! - POST /logout - End the session
//!
//! Requests sent by htmx (`HX-Request` header) get HTML fragments and
//! `HX-Redirect` headers instead of full-page redirects.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::api::dto::CredentialsForm;
use crate::api::error::{ApiError, ApiResult};
use crate::api::pages;
use crate::api::state::AppState;
use crate::auth::{AuthError, SessionToken};
use crate::config::SessionConfig;

const HX_REDIRECT: &str = "HX-Redirect";

/// Whether the request was issued by htmx
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .is_some_and(|value| !value.is_empty())
}

/// GET /register
pub async fn register_page() -> Html<String> {
    Html(pages::register_page())
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<CredentialsForm>,
) -> ApiResult<Response> {
    let htmx = is_htmx(&headers);

    match state.credentials.register(&form.username, &form.password).await {
        Ok(_) if htmx => Ok(Html(pages::alert_registration_complete()).into_response()),
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(AuthError::AlreadyExists) if htmx => Ok(Html(pages::alert_user_exists()).into_response()),
        Err(AuthError::AlreadyExists) => {
            Ok((StatusCode::BAD_REQUEST, "Username already exists").into_response())
        }
        Err(AuthError::InvalidInput(_)) if htmx => {
            Ok(Html(pages::alert_invalid_input()).into_response())
        }
        Err(AuthError::InvalidInput(reason)) => {
            Ok((StatusCode::BAD_REQUEST, reason).into_response())
        }
        Err(AuthError::Store(e)) => Err(ApiError::Store(e)),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// GET /login
pub async fn login_page() -> Html<String> {
    Html(pages::login_page())
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<CredentialsForm>,
) -> ApiResult<Response> {
    let htmx = is_htmx(&headers);

    let user_id = match state.credentials.verify(&form.username, &form.password).await {
        Ok(user_id) => user_id,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!(username = %form.username, "Login rejected");
            return Ok(if htmx {
                Html(pages::alert_invalid_credentials()).into_response()
            } else {
                (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response()
            });
        }
        Err(AuthError::Store(e)) => return Err(ApiError::Store(e)),
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    let token = state.sessions.create(user_id);
    let jar = jar.add(session_cookie(&state.config.sessions, token));
    tracing::info!(user_id, "User logged in");

    if htmx {
        Ok((jar, [(HX_REDIRECT, "/")]).into_response())
    } else {
        Ok((jar, Redirect::to("/")).into_response())
    }
}

/// POST /logout
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let cookie_name = &state.config.sessions.cookie_name;

    if let Some(cookie) = jar.get(cookie_name) {
        state.sessions.revoke(cookie.value());
    }

    let jar = jar.remove(Cookie::build((cookie_name.clone(), "")).path("/"));
    (jar, Redirect::to("/login")).into_response()
}

fn session_cookie(config: &SessionConfig, token: SessionToken) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token.into_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(config.ttl().as_secs() as i64))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));

        headers.insert("HX-Request", HeaderValue::from_static(""));
        assert!(!is_htmx(&headers));

        headers.insert("HX-Request", HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = SessionConfig::default();
        let cookie = session_cookie(&config, crate::auth::SessionRegistry::new(config.ttl()).create(1));

        assert_eq!(cookie.name(), "session_id");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));
    }
}
