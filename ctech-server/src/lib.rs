// ctech-server/src/lib.rs
use axum::{
    routing::{any, get, post},
    Router,
};
use ctech_common::{HostContext, LoadError, StoreError, UnitLoader, REST_PREFIX};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod admin;
pub mod auth;
pub mod bridge;
pub mod config;
pub mod css_cache;
pub mod rest;
pub mod store;
pub mod unit_registry;
pub mod units;
pub mod widget_catalog;

use auth::ActorDirectory;
use bridge::Bridge;
use config::ServerConfig;
use css_cache::CssFileCache;
use store::JsonFileStore;
use widget_catalog::JsonWidgetCatalog;

// --- Shared Application State ---
pub struct AppState {
    pub bridge: Arc<Bridge>,
    pub actors: ActorDirectory,
    pub request_count: AtomicUsize,
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(bridge: Arc<Bridge>, actors: ActorDirectory) -> Self {
        AppState {
            bridge,
            actors,
            request_count: AtomicUsize::new(0),
            startup_time: Instant::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot open site store: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Wire the file-backed host services named by `config` into a booted bridge.
pub fn assemble(config: &ServerConfig) -> Result<Arc<Bridge>, StartupError> {
    let host = HostContext::new(
        Arc::new(JsonFileStore::open(&config.store_path)?),
        Arc::new(CssFileCache::new(&config.css_cache_dir)),
        Arc::new(JsonWidgetCatalog::new(&config.widget_catalog_path)),
    );
    let loader = UnitLoader::new(&config.units_dir, units::catalog());
    let bridge = Bridge::new(host, loader);
    bridge.boot()?;
    Ok(Arc::new(bridge))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // --- Routes ---
        .route(REST_PREFIX, get(rest::index))
        .route(&format!("{}/*path", REST_PREFIX), any(rest::dispatch))
        .route("/api/admin/stats", get(admin::get_stats))
        .route("/api/admin/units", get(admin::get_units))
        .route("/api/admin/reload", post(admin::reload))
        // --- Layers ---
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
