//! Murmur HTTP API
//!
//! HTTP layer for Murmur, built with Axum.
//!
//! # Endpoints
//!
//! ## Pages
//! - `GET /` - Chat page (requires session)
//! - `GET /login`, `GET /register` - Credential forms
//!
//! ## Auth
//! - `POST /register` - Create an account
//! - `POST /login` - Start a session (sets the session cookie)
//! - `POST /logout` - End the session
//!
//! ## Chat
//! - `POST /send` - Persist and broadcast a message (requires session)
//! - `GET /events` - Server-sent event stream of new messages (requires session)
//!
//! ## Discovery
//! - `GET /.well-known/matrix/client`
//! - `GET /.well-known/matrix/server`
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## Static
//! - `GET /static/*` - Files from `server.static_dir`
//!
//! # Example
//!
//! ```rust,ignore
//! use murmur::api::{serve, AppState};
//! use murmur::config::Config;
//! use murmur::store::Database;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let database = Arc::new(Database::open(config.database.path.as_ref())?);
//!
//!     serve(AppState::new(database, config)).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod pages;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use extract::AuthUser;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Form bodies are small; anything past this is rejected before parsing
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let static_dir = ServeDir::new(&state.config.server.static_dir);
    let shared_state = Arc::new(state);

    Router::new()
        // Pages and auth
        .route("/", get(routes::chat::index))
        .route(
            "/register",
            get(routes::auth::register_page).post(routes::auth::register),
        )
        .route(
            "/login",
            get(routes::auth::login_page).post(routes::auth::login),
        )
        .route("/logout", post(routes::auth::logout))
        // Chat
        .route("/send", post(routes::chat::send_message))
        .route("/events", get(routes::events::stream_events))
        // Discovery
        .route(
            "/.well-known/matrix/client",
            get(routes::discovery::matrix_client),
        )
        .route(
            "/.well-known/matrix/server",
            get(routes::discovery::matrix_server),
        )
        .nest("/health", health_routes)
        .nest_service("/static", static_dir)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Start the server and run until Ctrl+C or SIGTERM
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Murmur listening on {}", addr);

    serve_with_shutdown(listener, state, shutdown_signal()).await
}

/// Serve on `listener` until `signal` resolves
///
/// Open event streams are closed when the signal fires, so in-flight
/// connections can drain instead of holding the server open.
pub async fn serve_with_shutdown<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    signal: F,
) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let streams = state.clone();
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            signal.await;
            streams.begin_shutdown();
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Murmur shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
