//! Vigil gateway server
//!
//! Run with: cargo run --bin vigil-gateway
//!
//! # Configuration
//!
//! Loaded from (first hit wins) `--config <path>`, the user config dir,
//! `/etc/vigil/config.toml`, or `./config.toml`, with `VIGIL_*` environment
//! variables overriding file values and CLI flags overriding both.
//!
//! - `VIGIL_HOST`: Host to bind to (default: 0.0.0.0)
//! - `VIGIL_PORT`: Port to listen on (default: 8080)
//! - `VIGIL_MAX_CONNECTIONS`: Connection limit (default: 1000)
//! - `VIGIL_SWEEP_INTERVAL_MS`: Expiry sweep interval (default: 1000)
//! - `RUST_LOG`: Log filter (default: from config, `vigil=info`)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil::config::{generate_default_config, Config};
use vigil::server::{shutdown_signal, Gateway, GatewayState};
use vigil::watcher::{ItemTracker, TrackerConfig, Watcher};

#[derive(Debug, Parser)]
#[command(name = "vigil-gateway", version, about = "Real-time watcher notification gateway")]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,

    /// Print a default config file and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("failed to load config from {:?}", path))?,
        None => Config::load_default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config);

    tracing::info!("Starting Vigil gateway v{}", env!("CARGO_PKG_VERSION"));

    // Reference watcher: in-memory tracker with expiry-driven invalidation.
    let tracker = Arc::new(ItemTracker::new(TrackerConfig {
        sweep_interval_ms: config.watcher.sweep_interval_ms,
        event_capacity: config.watcher.event_capacity,
    }));
    let sweep_task = tracker.start_expiry_sweep();

    let watcher: Arc<dyn Watcher> = tracker;
    let state = Arc::new(GatewayState::new(watcher, config.server.hub_config()));

    let gateway = Gateway::start(&config.server, state)
        .await
        .context("failed to start gateway")?;
    tracing::info!("Vigil gateway listening on {}", gateway.local_addr());

    shutdown_signal().await;

    gateway.stop().await;
    sweep_task.abort();
    tracing::info!("Vigil gateway stopped");

    Ok(())
}

/// Initialize the tracing subscriber from config, with `RUST_LOG` taking
/// precedence over the configured level.
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("vigil={},tower_http=warn", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
