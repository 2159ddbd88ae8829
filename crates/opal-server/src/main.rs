use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;

use opal_anchor::{AnchorWorker, LoggingAnchorRecorder};
use opal_server::{build_validator, AppState, OpalServer, ServerConfig};
use opal_store::InMemoryLedger;

#[derive(Parser)]
#[command(name = "opal-server", about = "Opal ledger server", version)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "opal.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let config = ServerConfig::load(&args.config)?;

    let storage = Arc::new(InMemoryLedger::new());
    let validator = build_validator(&config, storage.clone())?;
    let state = AppState {
        storage: storage.clone(),
        validator,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = config.anchoring.as_ref().map(|anchoring| {
        let worker = AnchorWorker::new(storage, Arc::new(LoggingAnchorRecorder)).with_intervals(
            Duration::from_secs(anchoring.poll_interval_secs),
            Duration::from_secs(anchoring.error_backoff_secs),
        );
        tokio::spawn(worker.run(shutdown_rx.clone()))
    });

    let server = OpalServer::new(config, state);
    tokio::select! {
        result = server.serve() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
    }

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker {
        let _ = handle.await;
    }
    Ok(())
}
