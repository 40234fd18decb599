//! Authentication error types

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the credential store and session registry
///
/// `InvalidCredentials` covers both an unknown username and a wrong
/// password so callers cannot tell the two apart.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Registration hit the username uniqueness constraint
    #[error("Username already exists")]
    AlreadyExists,

    /// Login failed
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, unknown or expired session cookie
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Username or password rejected before touching the store
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Store unavailable
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => AuthError::AlreadyExists,
            other => AuthError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_already_exists() {
        let err: AuthError = StoreError::Conflict("alice".to_string()).into();
        assert!(matches!(err, AuthError::AlreadyExists));

        let err: AuthError = StoreError::Lock("poisoned".to_string()).into();
        assert!(matches!(err, AuthError::Store(_)));
    }
}
