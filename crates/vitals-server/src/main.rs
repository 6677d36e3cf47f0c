//! Vitals Server - Main entry point

use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;
use vitals_common::logging::{init_logging, LogConfig};

use vitals_server::{config::Config, db, features, ingest, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("vitals-server")
        .filter_directives("vitals_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .with_env_overrides()?;
    let _log_guard = init_logging(&log_config)?;

    info!("Starting Vitals Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    tokio::fs::create_dir_all(&config.import.upload_dir)
        .await
        .with_context(|| {
            format!("Failed to create upload directory {}", config.import.upload_dir.display())
        })?;

    let db_pool = db::connect(&config.database)
        .await
        .context("Failed to open database")?;
    ingest::schema::ensure_schema(&db_pool)
        .await
        .context("Failed to prepare health_data table")?;

    let runner = Arc::new(ingest::ImportRunner::new(db_pool.clone(), config.import.clone()));

    let app = features::router(features::FeatureState {
        db: db_pool.clone(),
        runner,
    })
    .layer(middleware::tracing_layer())
    .layer(middleware::cors_layer(&config.cors));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    db_pool.close().await;
    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received terminate signal, starting graceful shutdown"),
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
