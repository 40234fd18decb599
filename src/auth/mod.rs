//! Authentication
//!
//! - **credentials**: password salting, hashing and verification
//! - **sessions**: in-memory session token registry
//! - **error**: `AuthError`
//!
//! Both components are owned objects injected through `AppState`; there is
//! no process-wide session map.

pub mod credentials;
pub mod error;
pub mod sessions;

pub use credentials::CredentialStore;
pub use error::AuthError;
pub use sessions::{SessionRegistry, SessionToken, DEFAULT_COOKIE_NAME};
