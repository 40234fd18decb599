//! Store error types
//!
//! Defines all errors that can occur in the persistence layer.

use thiserror::Error;

/// Errors that can occur in the message and user store
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed (creating the data directory, opening the file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite reported an error
    #[error("Database error: {0}")]
    Database(String),

    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0} already exists")]
    Conflict(String),

    /// Stored row could not be decoded
    #[error("Corrupt row: {0}")]
    Corruption(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
