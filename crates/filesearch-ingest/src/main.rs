//! filesearch CLI - Main entry point

use clap::Parser;
use filesearch_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use filesearch_ingest::cli::{commands, Cli};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout carries results, so console logs stay quiet unless asked for
    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("filesearch-cli")
        .build();
    let log_config = if std::env::var_os("LOG_LEVEL").is_some() {
        LogConfig::from_env().unwrap_or(log_config)
    } else {
        log_config
    };
    let _guard = init_logging(&log_config).ok();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight requests");
            on_signal.cancel();
        }
    });

    if let Err(e) = commands::execute(&cli, &cancel).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
