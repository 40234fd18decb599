//! Murmur server binary
//!
//! ```text
//! murmur serve [--config murmur.toml]
//! murmur config [--output murmur.toml]
//! murmur add-user <username> --password <password> [--config murmur.toml]
//! ```
//!
//! Environment variables (override the config file):
//! - `MURMUR_HOST`, `MURMUR_PORT` (or `PORT`)
//! - `MURMUR_STATIC_DIR`
//! - `MURMUR_DATABASE_PATH`
//! - `MURMUR_LOG_LEVEL`, `MURMUR_LOG_FORMAT` (`pretty` or `json`)
//! - `RUST_LOG`: Full filter directive, takes precedence over the level

use anyhow::Context;
use clap::{Parser, Subcommand};
use murmur::config::{generate_default_config, Config, LoggingConfig};
use murmur::store::Database;
use murmur::{AppState, CredentialStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "murmur")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Minimal real-time chat server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Config file (default: standard locations, then environment)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print a default config file
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a user account
    AddUser {
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config.logging);
            serve(config).await
        }
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote default config to {}", path.display());
                }
                None => print!("{}", content),
            }
            Ok(())
        }
        Commands::AddUser {
            username,
            password,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config.logging);

            let database = open_database(&config)?;
            let credentials = CredentialStore::new(database);
            let user_id = credentials
                .register(&username, &password)
                .await
                .with_context(|| format!("Failed to add user {}", username))?;

            println!("Created user {} (id {})", username, user_id);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Murmur v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.database.path);

    let database = open_database(&config)?;
    let purge_interval = config.sessions.purge_interval();
    let state = AppState::new(database, config);

    let purge_handle = state.sessions.start_purge_task(purge_interval);

    murmur::serve(state).await?;

    purge_handle.abort();
    tracing::info!("Murmur stopped");
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(Config::load_default()),
    }
}

fn open_database(config: &Config) -> anyhow::Result<Arc<Database>> {
    let database = Database::open(Path::new(&config.database.path))
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    Ok(Arc::new(database))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("murmur={},tower_http=info", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
