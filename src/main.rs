//! minibank - HTTP banking backend
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌───────────┐
//! │  Config  │───▶│  Store   │───▶│   Services   │───▶│  Gateway  │
//! │  (YAML)  │    │(PG / mem)│    │(auth/acct/tx)│    │  (axum)   │
//! └──────────┘    └──────────┘    └──────────────┘    └───────────┘
//! ```
//!
//! Usage: `minibank [--env|-e <name>] [--port <port>]`

use std::sync::Arc;

use anyhow::{Context, Result};

use minibank::config::{AppConfig, StorageBackend};
use minibank::db::Database;
use minibank::gateway::{self, state::AppState};
use minibank::store::{BankStore, MemoryStore, PgStore};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn BankStore>> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let db = Database::open(&config.storage)
                .await
                .context("PostgreSQL storage unavailable")?;
            Ok(Arc::new(PgStore::new(db.into_pool())))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; all data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = minibank::logging::init_logging(&app_config);

    tracing::info!(
        revision = env!("MINIBANK_REVISION"),
        "Starting minibank in {} mode",
        env
    );

    let store = open_store(&app_config).await?;
    let state = Arc::new(AppState::new(store, &app_config));

    gateway::run_server(&app_config.gateway, state).await
}
