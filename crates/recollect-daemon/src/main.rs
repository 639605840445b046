//! Recollect Daemon
//!
//! Long-running process that sends due memories back to their owners every
//! hour and runs the consolidation sweep once a night. Review sessions are
//! written to stdout, logs to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use recollect_core::Storage;
use recollect_daemon::{BackgroundService, ConsoleMessenger, DaemonConfig, LogFormat, VERSION};

/// Recollect review daemon
#[derive(Parser)]
#[command(name = "recollect-daemon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hourly review dispatch and nightly consolidation for Recollect")]
struct Args {
    /// Database path (overrides RECOLLECT_DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Log as JSON (overrides RECOLLECT_LOG_FORMAT)
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = DaemonConfig::from_env().context("Invalid configuration")?;
    if args.db_path.is_some() {
        config.db_path = args.db_path;
    }
    if args.json_logs {
        config.log_format = LogFormat::Json;
    }

    recollect_daemon::init_tracing(config.log_format)?;
    info!("Recollect daemon v{} starting...", VERSION);

    let storage = match Storage::new(config.db_path.clone()) {
        Ok(s) => {
            info!("Storage initialized successfully");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return Err(e).context("Could not open the memory database");
        }
    };

    let service = BackgroundService::start(storage, Arc::new(ConsoleMessenger::stdout()), &config);

    let cancel = service.cancellation();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown requested");
        }
        _ = cancel.cancelled() => {}
    }

    service.shutdown().await;
    info!("Recollect daemon shutting down");
    Ok(())
}
