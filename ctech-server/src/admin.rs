// ctech-server/src/admin.rs
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use ctech_common::{ApiError, Capability, StatsResponse, UnitsResponse, BRIDGE_VERSION};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

use crate::rest::error_response;
use crate::AppState;

pub fn format_uptime(uptime_secs: u64) -> String {
    format!(
        "{}d {}h {}m {}s",
        uptime_secs / 86400,
        (uptime_secs % 86400) / 3600,
        (uptime_secs % 3600) / 60,
        uptime_secs % 60
    )
}

// Get server stats
pub async fn get_stats(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(e) = state.actors.authorize(&headers, Capability::ManageOptions) {
        return error_response(&e);
    }

    let uptime_secs = state.startup_time.elapsed().as_secs();
    let stats = StatsResponse {
        version: BRIDGE_VERSION.to_string(),
        uptime_secs,
        uptime_formatted: format_uptime(uptime_secs),
        request_count: state.request_count.load(Ordering::SeqCst),
        unit_count: state.bridge.registry().len(),
        route_count: state.bridge.routes().len(),
    };
    Json(stats).into_response()
}

// Get active units, skipped directories and routes
pub async fn get_units(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(e) = state.actors.authorize(&headers, Capability::ManageOptions) {
        return error_response(&e);
    }

    let bridge = &state.bridge;
    let response = UnitsResponse {
        units: bridge.registry().infos(bridge.host()),
        skipped: bridge
            .last_report()
            .iter()
            .filter_map(|s| serde_json::to_value(s).ok())
            .collect(),
        routes: bridge
            .routes()
            .infos()
            .iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect(),
    };
    Json(response).into_response()
}

// Re-run unit discovery
pub async fn reload(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let actor = match state.actors.authorize(&headers, Capability::ManageOptions) {
        Ok(actor) => actor,
        Err(e) => return error_response(&e),
    };
    info!("Unit reload requested by {}", actor.name);

    let bridge = Arc::clone(&state.bridge);
    match tokio::task::spawn_blocking(move || bridge.boot()).await {
        Ok(Ok(summary)) => Json(json!({
            "loaded": summary.loaded,
            "skipped": summary.skipped,
            "routes": summary.routes,
        }))
        .into_response(),
        Ok(Err(e)) => {
            error!("Unit reload failed: {}", e);
            error_response(&ApiError::internal(format!("Unit reload failed: {}", e)))
        }
        Err(e) => {
            error!("Unit reload task failed: {}", e);
            error_response(&ApiError::internal("Unit reload failed unexpectedly."))
        }
    }
}
