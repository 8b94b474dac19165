//! Payrail Server
//!
//! An event-driven payment pipeline: an HTTP producer API publishes payment
//! and refund events onto a partitioned event bus, and consumer worker pools
//! settle, audit and notify.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use payrail_core::bus::InMemoryBus;
use payrail_core::consumer::{Consumer, SimulatedSettlement};
use payrail_core::idempotency::InMemoryIdempotencyGuard;
use payrail_core::notify::NotificationRouter;
use payrail_core::publisher::EventPublisher;
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Payrail - Event-driven payment processing pipeline
#[derive(Parser, Debug)]
#[command(name = "payrail-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./payrail.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting payrail-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Create the event bus
    let bus = Arc::new(InMemoryBus::with_max_attempts(
        loaded_config.bus.max_delivery_attempts,
    ));

    // Spawn the consumer worker pools
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = Consumer::new(
        bus.clone(),
        Arc::new(InMemoryIdempotencyGuard::new()),
        Arc::new(InMemoryIdempotencyGuard::new()),
        Arc::new(SimulatedSettlement::new(
            loaded_config.processing.payment_delay,
            loaded_config.processing.refund_delay,
        )),
        Arc::new(NotificationRouter::logging()),
        loaded_config.consumer,
    );
    let worker_handles = consumer.spawn(shutdown_rx);
    tracing::info!("Consumer workers started");

    // Create application state
    let state = AppState::new(EventPublisher::new(bus.clone()));

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop the workers: signal shutdown, then close the bus so blocked
    // subscribers wake up after the backlog drains.
    tracing::info!("Stopping consumer workers...");
    let _ = shutdown_tx.send(true);
    bus.close();
    for handle in worker_handles {
        if let Err(e) = handle.await {
            tracing::warn!("Worker task ended abnormally: {}", e);
        }
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
