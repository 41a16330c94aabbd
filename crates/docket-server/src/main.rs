//! Docket REST API Server
//!
//! This binary starts the Docket REST API server, exposing endpoints for
//! starting and polling syncs and reading synced matters.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use docket_client::{PracticeClient, StaticTokenProvider};
use docket_core::{DbConfig, HttpConfig, SyncConfig};

use docket_server::{AppState, ServerConfig, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let config = ServerConfig::parse();
    let db_config = DbConfig::from_env().context("Invalid database configuration")?;
    let http_config = HttpConfig::from_env().context("Invalid HTTP configuration")?;
    let sync_config = SyncConfig::from_env().context("Invalid sync configuration")?;

    // Connect to database
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connection established");

    if config.apply_schema {
        docket_db::schema::apply(&pool)
            .await
            .context("Failed to apply database schema")?;
    }

    let client = PracticeClient::new(&config.api_url, http_config)
        .context("Failed to initialize case-management client")?;
    let static_tokens = StaticTokenProvider::new(config.api_token.clone());
    if !static_tokens.is_configured() {
        warn!("DOCKET_API_TOKEN is not set, reading credentials from the database");
    }

    // Create shutdown token for graceful shutdown
    let shutdown_token = CancellationToken::new();

    let app_state = AppState::new(
        pool,
        client,
        static_tokens,
        sync_config,
        shutdown_token.clone(),
    );

    let app = create_router(app_state, &config.cors_origins);

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid address")?;

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Starting Docket API server on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// Background syncs are not awaited; an interrupted run stays `syncing` and
/// is reset by the next start request.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");

    shutdown_token.cancel();

    // Let in-flight requests finish
    tokio::time::sleep(Duration::from_secs(2)).await;
}
