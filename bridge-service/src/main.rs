use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

mod access;
mod api;
mod config;
mod error;
mod host;
mod queries;
mod service;
mod websocket;

use crate::service::BridgeService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting Foundry bridge service v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        module_id = %config.bridge.module_id,
        call_timeout_secs = ?config.host.call_timeout_secs,
        "Configuration loaded"
    );

    let addr = config.bind_address();
    let service = Arc::new(BridgeService::new(config));
    service.activate();
    info!(
        count = service.registered_methods().len(),
        "Query handlers registered"
    );

    let app = api::router(service.clone());

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let removed = service.deactivate();
    info!(removed, "Query handlers unregistered");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bridge_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
