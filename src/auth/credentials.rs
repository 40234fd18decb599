//! Credential Store
//!
//! Salts and hashes passwords on registration and verifies login attempts.
//! The digest is SHA-256 over `password ‖ salt` with a fresh 16-byte salt per
//! user; both are stored base64 encoded.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::error::AuthError;
use crate::store::{UserId, UserStore};

const SALT_LEN: usize = 16;

/// Longest accepted username, in characters
pub const MAX_USERNAME_LEN: usize = 32;

/// Salt used to burn the same hashing work when a username is unknown
const DUMMY_SALT: &str = "bXVybXVyLWR1bW15LXNhbHQ";

/// Registers users and verifies their passwords
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Register a new user
    ///
    /// Fails with `AlreadyExists` when the username is taken; the existing
    /// account is left untouched.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserId, AuthError> {
        validate(username, password)?;

        let salt = generate_salt();
        let hash = hash_password(password, &salt);

        let user_id = self.users.insert_user(username, &hash, &salt).await?;
        tracing::info!(user_id, username = %username, "User registered");
        Ok(user_id)
    }

    /// Verify a login attempt and return the user's id
    pub async fn verify(&self, username: &str, password: &str) -> Result<UserId, AuthError> {
        let stored = self.users.find_credentials(username).await?;

        match stored {
            Some(creds) => {
                let candidate = hash_password(password, &creds.salt);
                if constant_time_eq(candidate.as_bytes(), creds.password_hash.as_bytes()) {
                    Ok(creds.user_id)
                } else {
                    tracing::debug!(username = %username, "Password mismatch");
                    Err(AuthError::InvalidCredentials)
                }
            }
            None => {
                std::hint::black_box(hash_password(password, DUMMY_SALT));
                tracing::debug!(username = %username, "Unknown username");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

fn validate(username: &str, password: &str) -> Result<(), AuthError> {
    if username.trim().is_empty() {
        return Err(AuthError::InvalidInput("username cannot be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AuthError::InvalidInput(format!(
            "username exceeds {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidInput("password cannot be empty".to_string()));
    }
    Ok(())
}

fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut bytes);
    STANDARD_NO_PAD.encode(bytes)
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    STANDARD_NO_PAD.encode(hasher.finalize())
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_register_then_verify() {
        let creds = store();

        let id = creds.register("alice", "pw1").await.unwrap();
        let verified = creds.verify("alice", "pw1").await.unwrap();

        assert_eq!(id, verified);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let creds = store();
        creds.register("alice", "pw1").await.unwrap();

        let result = creds.verify("alice", "pw2").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let result = creds.verify("alice", "").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_unknown_user_indistinguishable_from_wrong_password() {
        let creds = store();
        creds.register("alice", "pw1").await.unwrap();

        let unknown = creds.verify("mallory", "pw1").await.unwrap_err();
        let wrong = creds.verify("alice", "nope").await.unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let creds = store();

        let first = creds.register("alice", "pw1").await.unwrap();
        let result = creds.register("alice", "other").await;
        assert!(matches!(result, Err(AuthError::AlreadyExists)));

        // Original password still works
        assert_eq!(creds.verify("alice", "pw1").await.unwrap(), first);
        assert!(creds.verify("alice", "other").await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_registration_single_winner() {
        let creds = Arc::new(store());

        let mut handles = Vec::new();
        for i in 0..8 {
            let creds = Arc::clone(&creds);
            handles.push(tokio::spawn(async move {
                creds.register("race", &format!("pw{}", i)).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, AuthError::AlreadyExists)),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let creds = store();

        assert!(matches!(
            creds.register("", "pw").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            creds.register("alice", "").await,
            Err(AuthError::InvalidInput(_))
        ));
        let long_name = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(matches!(
            creds.register(&long_name, "pw").await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(generate_salt(), generate_salt());
        assert_ne!(hash_password("pw", "a"), hash_password("pw", "b"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
