//! # labsimd — labsim daemon
//!
//! Composition root that wires the core together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize tracing
//! - Construct the device registry with the configured simulation defaults
//! - Build the axum router, injecting the registry
//! - Bind to a TCP port and serve
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use labsim_adapter_http_axum::state::AppState;
use labsim_app::registry::DeviceRegistry;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let filter = if config.server.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&config.logging.filter)
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let registry = DeviceRegistry::new(config.simulation_defaults());
    let state = AppState::new(registry);
    let app = labsim_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    tracing::info!(%bind_addr, "labsimd listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
    }
}
