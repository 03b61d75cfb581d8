pub mod api;
pub mod config;
pub mod db;
pub mod entities;
pub mod parser;
pub mod services;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

pub use config::Config;
use state::SharedState;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line overrides applied on top of the loaded config.
#[derive(Debug, Default, Clone)]
pub struct ServerOverrides {
    pub config_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

pub async fn run(overrides: ServerOverrides) -> anyhow::Result<()> {
    let mut config = match &overrides.config_path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(host) = overrides.host {
        config.server.host = host;
    }
    if let Some(port) = overrides.port {
        config.server.port = port;
    }

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;

    let shared = Arc::new(SharedState::new(config.clone()).await?);
    let state = api::create_app_state(shared);
    let app = api::router(state).await;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("License API running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
