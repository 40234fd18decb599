//! SQLite store
//!
//! Users and messages live in a single SQLite file. The connection is held
//! behind a `std::sync::Mutex` (rusqlite connections are not `Sync`); every
//! statement is short so the lock is never held across an await point.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::error::{StoreError, StoreResult};
use super::types::{Message, UserCredentials, UserId};
use super::{MessageStore, UserStore};

/// SQLite-backed user and message store
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Create or open the database file, creating tables as needed
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database (tests and throwaway runs)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);
            ",
        )?;

        tracing::debug!(path = ?path, "Database tables initialized");

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Path of the backing file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Cheap liveness check used by the readiness probe
    pub fn ping(&self) -> bool {
        match self.conn() {
            Ok(conn) => conn
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Number of registered users
    pub fn user_count(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

fn timestamp_from_millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corruption(format!("timestamp out of range: {}", ms)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl UserStore for Database {
    async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        salt: &str,
    ) -> StoreResult<UserId> {
        let conn = self.conn()?;
        let now = Utc::now().timestamp_millis();

        match conn.execute(
            "INSERT INTO users (username, password_hash, salt, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![username, password_hash, salt, now],
        ) {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(username.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<UserCredentials>> {
        let conn = self.conn()?;

        let creds = conn
            .query_row(
                "SELECT id, password_hash, salt FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserCredentials {
                        user_id: row.get(0)?,
                        password_hash: row.get(1)?,
                        salt: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(creds)
    }
}

#[async_trait]
impl MessageStore for Database {
    async fn persist_message(&self, user_id: UserId, content: &str) -> StoreResult<Message> {
        let conn = self.conn()?;
        let created_at = Utc::now().timestamp_millis();

        conn.execute(
            "INSERT INTO messages (user_id, content, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, content, created_at],
        )?;
        let id = conn.last_insert_rowid();

        let username: String = conn
            .query_row(
                "SELECT username FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or_default();

        Ok(Message::new(
            id,
            username,
            content,
            timestamp_from_millis(created_at)?,
        ))
    }

    async fn lookup_username(&self, user_id: UserId) -> String {
        let conn = match self.conn() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "Username lookup failed");
                return String::new();
            }
        };

        conn.query_row(
            "SELECT username FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .unwrap_or_default()
    }

    async fn recent_messages(&self, limit: usize) -> StoreResult<Vec<Message>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare_cached(
            "SELECT m.id, u.username, m.content, m.created_at
             FROM messages m
             JOIN users u ON m.user_id = u.id
             ORDER BY m.created_at DESC, m.id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, username, content, created_at) = row?;
            messages.push(Message::new(
                id,
                username,
                content,
                timestamp_from_millis(created_at)?,
            ));
        }

        Ok(messages)
    }
}
