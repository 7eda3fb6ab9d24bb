use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use codecadet_api::{app, config::AppConfig, AppState};

#[derive(Parser)]
#[command(name = "codecadet-api")]
#[command(about = "CodeCadet API server")]
#[command(version)]
struct Args {
    #[arg(long, help = "Port to listen on (overrides CODECADET_PORT / PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Address to bind (overrides SERVER_BIND_ADDR)")]
    bind: Option<String>,

    #[arg(long, help = "Directory holding users/, lessons.json and challenges.json")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up FIREBASE_*, CODECADET_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    tracing::info!(
        "Starting CodeCadet API in {:?} mode (data dir: {})",
        config.environment,
        config.storage.data_dir.display()
    );

    if config.test_token_outside_development() {
        tracing::warn!(
            "Test token bypass is enabled outside development ({:?}); any caller can act as the test user",
            config.environment
        );
    }

    let bind_addr = format!("{}:{}", config.server.bind_addr, config.server.port);
    let state = AppState::from_config(config);
    if !state.auth.has_provider() {
        tracing::warn!("No identity provider configured; only test tokens can authenticate");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("CodeCadet API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
