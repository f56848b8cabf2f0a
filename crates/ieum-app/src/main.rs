//! Ieum server entry point.
//!
//! Loads configuration, opens the database, connects the Assistants API
//! client and serves the HTTP API.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ieum_api::{start_server, AppState};
use ieum_core::config::IeumConfig;
use ieum_llm::OpenAiAssistantClient;
use ieum_storage::Database;

use crate::cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    match data_dir.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(rest)
        }
        None => PathBuf::from(data_dir),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = IeumConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    config.general.port = args.resolve_port(config.general.port);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Ieum v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    if config.report.assistant_id.is_empty() || config.report.thread_id.is_empty() {
        tracing::warn!("report.assistant_id / report.thread_id not set; report analysis will fail");
    }

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("ieum.db");
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Upstream assistant.
    let api = OpenAiAssistantClient::from_config(&config.llm)?;

    let state = AppState::new(config.clone(), db, Arc::new(api));
    start_server(&config, state).await?;

    Ok(())
}
