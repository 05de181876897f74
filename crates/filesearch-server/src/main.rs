//! filesearch server - main entry point

use anyhow::{Context, Result};
use filesearch_common::logging::{init_logging, LogConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use filesearch_server::{config::Config, create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("filesearch-server")
        .filter_directives("filesearch_server=debug,filesearch_ingest=debug,tower_http=debug")
        .build();

    // Environment variables take precedence
    let log_config = if std::env::var_os("LOG_LEVEL").is_some() || std::env::var_os("LOG_FILTER").is_some() {
        LogConfig::from_env().unwrap_or(log_config)
    } else {
        log_config
    };

    let _guard = init_logging(&log_config)?;

    info!("Starting filesearch server");

    let config = Config::load().context("Failed to load configuration")?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let shutdown = CancellationToken::new();
    let state = AppState::new(&config, shutdown.clone()).context("Failed to build provider client")?;
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid APP_HOST/APP_PORT")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    filesearch_server::serve(
        listener,
        app,
        shutdown_signal(),
        shutdown,
        Duration::from_secs(config.server.shutdown_timeout_secs),
    )
    .await?;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
