// ctech-server/src/main.rs
use ctech_server::{assemble, auth::ActorDirectory, build_router, config::ServerConfig, AppState};
use std::{error::Error, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::load()?;
    let actors = ActorDirectory::new(config.actors.clone());
    if actors.is_empty() {
        warn!("No actors configured; every API request will be rejected");
    }

    let bridge = assemble(&config)?;
    info!("Loaded {} unit(s) from {}", bridge.registry().len(), config.units_dir.display());

    let app_state = Arc::new(AppState::new(bridge, actors));
    let app_router = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down successfully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received...");
}
