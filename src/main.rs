use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reviewer_service::api::{self, AppState};
use reviewer_service::config::AppConfig;
use reviewer_service::database::{Database, DatabaseOptions};
use reviewer_service::engine::AssignmentEngine;

#[derive(Parser)]
#[command(name = "reviewer-service")]
#[command(about = "Assigns and rebalances pull request reviewers within teams")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let default_filter = config
        .log_level
        .clone()
        .unwrap_or_else(|| "reviewer_service=debug,tower_http=debug".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reviewer service");

    let options = DatabaseOptions {
        url: config.database_url.clone(),
        max_connections: config.max_connections,
        busy_timeout: Duration::from_secs(config.busy_timeout_secs),
    };
    let database = Database::connect(&options)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    info!("Database connected");

    database
        .run_migrations()
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    let state = AppState::new(AssignmentEngine::new(database.clone()));
    let app = api::router(state, Duration::from_secs(config.request_timeout_secs));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    database.close().await;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
