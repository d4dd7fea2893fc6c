//! hey-service
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                 HEY SERVICE                  │
//!                  │                                              │
//!   GET/POST /ping │  ┌─────────┐    ┌──────────┐                 │
//!  ────────────────┼─▶│  http   │───▶│  ping /  │                 │
//!                  │  │ server  │    │  health  │                 │
//!                  │  └────▲────┘    └──────────┘                 │
//!                  │       │ start / stop                         │
//!                  │  ┌────┴─────────┐   publish    ┌───────────┐ │
//!   SIGINT/SIGTERM │  │  lifecycle   │─────────────▶│ discovery │─┼──▶ Redis / REST
//!  ────────────────┼─▶│ orchestrator │◀─────────────│  backend  │ │    registry
//!                  │  └──────────────┘   unpublish  └───────────┘ │
//!                  └──────────────────────────────────────────────┘
//! ```
//!
//! Exit codes: 0 after a clean shutdown, 1 when the listener cannot start,
//! 2 on invalid configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hey_service::config::{self, ObservabilityConfig};
use hey_service::discovery;
use hey_service::lifecycle::{signals, Orchestrator};
use hey_service::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "hey-service")]
#[command(about = "HTTP ping service that registers itself for discovery", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults and environment apply without one
    #[arg(short, long, env = "HEY_SERVICE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hey-service starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        port = config.listener.port,
        name = %config.record.name,
        backend = %config.discovery.backend,
        "Configuration loaded"
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

    let backend = match discovery::connect(&config.discovery) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(error = %e, "Invalid discovery backend configuration");
            return ExitCode::from(2);
        }
    };

    let orchestrator = Orchestrator::new(config, backend);
    let signals = signals::forward_signals(orchestrator.shutdown_handle());

    let result = orchestrator.run().await;
    signals.abort();

    match result {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "hey-service failed");
            ExitCode::FAILURE
        }
    }
}
