//! Edge traffic logger and redirector.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 EDGE SERVICE                 │
//!   Client Request       │  ┌─────────────┐     ┌──────────────┐        │
//!   ─────────────────────┼─▶│ interceptor │────▶│  downstream  │        │
//!                        │  └──────┬──────┘     │ upstream/fs  │        │
//!                        │         │            └──────┬───────┘        │
//!                        │         │   response ◀──────┘                │
//!                        │         ├──────────────▶ background task     │
//!                        │         │                record → persister ─┼──▶ object store
//!                        │         ▼                                    │
//!   301 Location         │  ┌─────────────┐                             │
//!   ◀────────────────────┼──│  redirect   │                             │
//!                        │  │  resolver   │                             │
//!                        │  └─────────────┘                             │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use traffic_redirector::config::loader::load_config;
use traffic_redirector::config::validation::validate_config;
use traffic_redirector::config::EdgeConfig;
use traffic_redirector::lifecycle::signals::spawn_signal_listener;
use traffic_redirector::observability::{logging, metrics};
use traffic_redirector::{EdgeServer, Shutdown};

#[derive(Parser)]
#[command(name = "traffic-redirector")]
#[command(about = "Logs edge traffic to object storage and redirects to the canonical site", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })?;
    }

    logging::init_logging(&config.observability);
    tracing::info!("traffic-redirector v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        storage = ?config.storage.backend,
        canonical_host = %config.redirect.canonical_host,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = EdgeServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
