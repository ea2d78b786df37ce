//! fleetpulsed — the fleetpulse daemon.
//!
//! Loads the service catalog, starts the background monitor and the image
//! version sweep, and serves the REST API and event stream.
//!
//! # Usage
//!
//! ```text
//! fleetpulsed --port 43565 --catalog config/services.json
//! PORT=8080 fleetpulsed
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use fleetpulse_api::{build_router, AppState};
use fleetpulse_health::version::VersionChecker;
use fleetpulse_health::{Monitor, MonitorConfig};
use fleetpulse_registry::{catalog, Registry};

/// Fallback listen port when neither `--port` nor `PORT` is set.
const DEFAULT_PORT: u16 = 43565;

#[derive(Parser)]
#[command(name = "fleetpulsed", about = "Fleet health monitor daemon")]
struct Cli {
    /// Port to listen on (overrides the PORT environment variable).
    #[arg(long)]
    port: Option<u16>,

    /// Explicit catalog path; the standard locations are tried otherwise.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Seconds between fleet check cycles.
    #[arg(long, default_value = "30")]
    interval: u64,

    /// Registry owner whose images the version sweep inspects.
    #[arg(long, default_value = "fleetpulse")]
    image_owner: String,

    /// Seconds between image version sweeps.
    #[arg(long, default_value = "3600")]
    version_interval: u64,
}

fn listen_port(cli_port: Option<u16>) -> u16 {
    cli_port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetpulse=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let port = listen_port(cli.port);

    info!(port, "fleetpulse daemon starting");

    // ── Registry and catalog ───────────────────────────────────

    let registry = Arc::new(Registry::new());
    match catalog::load_services(&registry, port, cli.catalog.as_deref()).await {
        Ok(count) => info!(count, "catalog loaded"),
        // A broken catalog leaves only the self-record; keep running.
        Err(err) => error!(error = %err, "catalog load failed"),
    }

    // ── Monitor ────────────────────────────────────────────────

    let config = MonitorConfig {
        interval: Duration::from_secs(cli.interval),
        ..MonitorConfig::default()
    };
    let monitor = Arc::new(Monitor::with_config(registry.clone(), config)?);
    info!(interval_secs = cli.interval, "monitor initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background tasks ───────────────────────────────────────

    let monitor_handle = tokio::spawn(Arc::clone(&monitor).run(shutdown_rx.clone()));

    let version_checker = VersionChecker::new(cli.image_owner)?;
    let version_handle = tokio::spawn(version_checker.run(
        registry.clone(),
        Duration::from_secs(cli.version_interval),
        shutdown_rx,
    ));
    info!(interval_secs = cli.version_interval, "version sweep scheduled");

    // ── API server ─────────────────────────────────────────────

    let router = build_router(AppState {
        registry,
        monitor,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = monitor_handle.await;
    let _ = version_handle.await;

    info!("fleetpulse daemon stopped");
    Ok(())
}
