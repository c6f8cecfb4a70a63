// ctech-common/src/lib.rs
use serde::{Deserialize, Serialize};

// Define modules
pub mod error;
pub mod fields;
pub mod host;
pub mod loader;
pub mod route;
pub mod settings;
pub mod unit;

// Re-export for convenience
pub use error::{ApiError, CacheError, ErrorBody, StoreError, UnitError};
pub use fields::{FieldKind, FieldMap, FieldSpec};
pub use host::{
    Actor, CacheInvalidator, Capability, Document, HostContext, KeyValueStore, MemoryStore,
    NoopCache, StaticWidgetCatalog, StoreData, WidgetCatalog,
};
pub use loader::{LoadError, LoadReport, SkipReason, SkippedUnit, UnitCatalog, UnitLoader};
pub use route::{Method, RouteInfo, RouteMatch, RouteRequest, RouteSpec, RouteTable};
pub use settings::{
    extract_subset, AllowList, SettingsBlob, SettingsEngine, SettingsError, SettingsSurface,
    Snapshot, Target, UpdateResult,
};
pub use unit::{Unit, UnitFactory, UnitInfo};

// --- Protocol Constants ---
/// REST namespace every unit route is mounted under.
pub const REST_NAMESPACE: &str = "communitytech/v1";
/// URL prefix of the REST namespace.
pub const REST_PREFIX: &str = "/wp-json/communitytech/v1";
pub const BRIDGE_VERSION: &str = env!("CARGO_PKG_VERSION");

// --- Admin API payloads ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UnitsResponse {
    pub units: Vec<UnitInfo>,
    #[serde(default)]
    pub skipped: Vec<serde_json::Value>,
    #[serde(default)]
    pub routes: Vec<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatsResponse {
    pub version: String,
    pub uptime_secs: u64,
    pub uptime_formatted: String,
    pub request_count: usize,
    pub unit_count: usize,
    pub route_count: usize,
}
