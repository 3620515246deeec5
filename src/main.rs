//! Proxy control plane.
//!
//! # Architecture Overview
//!
//! ```text
//!   fragment dirs ──▶ ConfigWatcher ──▶ SyncEvent channel
//!                      (notify)               │
//!                                             ▼
//!                                       Synchronizer ──▶ FragmentStore
//!                                             │
//!                                             ▼
//!                                  merge ──▶ translate ──▶ consistency check
//!                                                              │
//!                                                              ▼
//!   admin API (axum) ◀────────────── SnapshotHandle ◀──── Publisher
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use proxy_control_plane::admin::{self, AdminState};
use proxy_control_plane::config::{load_config, validate_config, ConfigError, ControlPlaneConfig};
use proxy_control_plane::fragment::FileFragmentParser;
use proxy_control_plane::lifecycle::{shutdown, Shutdown};
use proxy_control_plane::observability::{logging, metrics};
use proxy_control_plane::snapshot::{JsonTranslator, Publisher, SnapshotHandle};
use proxy_control_plane::sync::{ConfigWatcher, SyncOptions, Synchronizer};

#[derive(Parser)]
#[command(name = "proxy-control-plane")]
#[command(about = "Reconciles proxy configuration fragments into versioned snapshots", long_about = None)]
struct Args {
    /// Path to the service configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let config = ControlPlaneConfig::default();
            if let Err(errors) = validate_config(&config) {
                return Err(ConfigError::Validation(errors).into());
            }
            config
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        node_id = %config.node_id,
        watch_paths = ?config.watch.paths,
        duplicates = ?config.merge.duplicates,
        "proxy-control-plane starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let handle = SnapshotHandle::new();
    let publisher = Publisher::new(
        config.node_id.clone(),
        config.merge.duplicates,
        Box::new(JsonTranslator::new()),
        handle.clone(),
    );
    let synchronizer = Synchronizer::new(
        Box::new(FileFragmentParser::new(config.listeners.clone())),
        publisher,
        SyncOptions {
            ignore_hidden: config.watch.ignore_hidden,
        },
    );

    let (watcher, events) = ConfigWatcher::new(
        config.watch.paths.clone(),
        Duration::from_secs(config.watch.poll_interval_secs),
    );
    let sync_task = tokio::task::spawn_blocking(move || synchronizer.run(events));
    let watcher = watcher.run()?;

    let shutdown = Shutdown::new();

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(handle.clone(), &config.admin.api_key);
        let rx = shutdown.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, rx).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }))
    } else {
        None
    };

    shutdown::ctrl_c().await;
    shutdown.trigger();

    if let Some(task) = admin_task {
        let _ = task.await;
    }

    // Dropping the watcher closes the event channel and ends the sync loop.
    drop(watcher);
    sync_task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
