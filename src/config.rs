//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::broadcast::RegistryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub sessions: SessionConfig,

    #[serde(default)]
    pub broadcast: BroadcastConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served under `/static/`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// SQLite database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("murmur").join("murmur.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./murmur_data/murmur.db".to_string())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Session cookie and registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Session lifetime; also the cookie's Max-Age
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,

    /// Mark the cookie `Secure` (serve over HTTPS)
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_cookie_name() -> String {
    crate::auth::DEFAULT_COOKIE_NAME.to_string()
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_purge_interval() -> u64 {
    300 // 5 minutes
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_hours: default_ttl_hours(),
            purge_interval_secs: default_purge_interval(),
            secure_cookie: false,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs.max(1))
    }
}

/// Live-update stream configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,

    /// Pending messages per subscriber before it is evicted as too slow
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// Rendered frames buffered between a stream loop and its socket
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Idle keep-alive comment interval, 0 disables
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

fn default_max_subscribers() -> usize {
    1000
}

fn default_subscriber_buffer() -> usize {
    64
}

fn default_outbound_buffer() -> usize {
    16
}

fn default_keep_alive() -> u64 {
    15
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_subscribers: default_max_subscribers(),
            subscriber_buffer: default_subscriber_buffer(),
            outbound_buffer: default_outbound_buffer(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

impl BroadcastConfig {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_subscribers: self.max_subscribers,
            subscriber_buffer: self.subscriber_buffer,
        }
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

/// Chat behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Messages shown on the index page
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Longest accepted message, in characters
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

fn default_history_limit() -> usize {
    50
}

fn default_max_message_len() -> usize {
    2000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            max_message_len: default_max_message_len(),
        }
    }
}

/// Matrix `.well-known` delegation; endpoints return 404 when unset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryConfig {
    /// Value of `m.homeserver.base_url`, e.g. `https://matrix.example.org`
    pub matrix_homeserver: Option<String>,

    /// Value of `m.server`, e.g. `matrix.example.org:443`
    pub matrix_server: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("murmur").join("config.toml")),
            Some(PathBuf::from("/etc/murmur/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides; bare PORT is honoured for container platforms
        if let Some(host) = var("MURMUR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("MURMUR_PORT").or_else(|| var("PORT")) {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(dir) = var("MURMUR_STATIC_DIR") {
            self.server.static_dir = dir;
        }

        if let Some(path) = var("MURMUR_DATABASE_PATH") {
            self.database.path = path;
        }

        // Logging overrides
        if let Some(level) = var("MURMUR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("MURMUR_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
///
/// The database path is the same one `Config::default()` resolves to.
pub fn generate_default_config() -> String {
    let database_path = toml::Value::String(default_database_path()).to_string();

    format!(
        r#"# Murmur Configuration
#
# Environment variables override these settings:
# - MURMUR_HOST
# - MURMUR_PORT (or PORT)
# - MURMUR_STATIC_DIR
# - MURMUR_DATABASE_PATH
# - MURMUR_LOG_LEVEL
# - MURMUR_LOG_FORMAT

[server]
# HTTP listen address
host = "0.0.0.0"
port = 8080

# Directory served under /static/
static_dir = "static"

[database]
# SQLite database file
path = {database_path}

[sessions]
# Name of the session cookie
cookie_name = "session_id"

# Session lifetime in hours (also the cookie Max-Age)
ttl_hours = 24

# How often expired sessions are purged (seconds)
purge_interval_secs = 300

# Set the Secure flag on the cookie (requires HTTPS)
secure_cookie = false

[broadcast]
# Maximum concurrently open /events streams
max_subscribers = 1000

# Messages a stream may fall behind before it is disconnected
subscriber_buffer = 64

# Rendered frames buffered per connection
outbound_buffer = 16

# Keep-alive comment interval in seconds (0 disables)
keep_alive_secs = 15

[chat]
# Messages shown on the index page
history_limit = 50

# Longest accepted message in characters
max_message_len = 2000

[discovery]
# Matrix .well-known delegation (omit to disable)
# matrix_homeserver = "https://matrix.example.org"
# matrix_server = "matrix.example.org:443"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    )
}
