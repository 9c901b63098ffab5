//! Linkerd tap proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  TAP PROXY                        │
//!   GET /deployment   │  ┌──────────┐    ┌──────────────┐                 │
//!   ──────────────────┼─▶│ handlers │───▶│ upstream     │──── HTTPS ──────┼──▶ API server
//!                     │  └──────────┘    │ http client  │  Bearer token   │    service proxy
//!                     │                  └──────────────┘                 │        │
//!   WS /tap           │  ┌──────────┐    ┌──────────────┐                 │        ▼
//!   ◀─────────────────┼─▶│  bridge  │◀──▶│ upstream ws  │◀─── WSS ────────┼──▶ linkerd-web
//!                     │  │ sessions │    │ (tap)        │                 │    /api/tap
//!                     │  └──────────┘    └──────────────┘                 │
//!                     │  config · cluster · observability · lifecycle     │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use mesh_tap_proxy::config::load_config;
use mesh_tap_proxy::lifecycle::{signals, Shutdown};
use mesh_tap_proxy::observability::{logging, metrics};
use mesh_tap_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "mesh-tap-proxy")]
#[command(about = "Relay Linkerd dashboard queries and tap streams from a Kubernetes cluster", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "tap-proxy.toml")]
    config: PathBuf,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "mesh-tap-proxy starting"
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

    let shutdown = Shutdown::new();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config, shutdown.clone())?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    signals::spawn_signal_handler(shutdown);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
