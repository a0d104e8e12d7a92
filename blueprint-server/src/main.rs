use std::sync::Arc;

use blueprint_core::BlueprintConfig;
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use blueprint_server::subsystems::sessions::SessionStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML config; BLUEPRINT_* environment variables override it
    #[arg(short, long, default_value = "blueprint.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match BlueprintConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},tower_http=debug", config.service.log_level))
    });
    fmt().with_env_filter(filter).init();

    let store = Arc::new(SessionStore::new());
    let state = match blueprint_server::build_state(config.clone(), store.clone()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to initialise blueprint services: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    // Evict idle sessions in the background
    tokio::spawn(blueprint_server::subsystems::sweeper::run_session_sweeper(
        store,
        config.sessions.clone(),
        tx.subscribe(),
    ));

    blueprint_server::http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
