// ctech-server/src/bridge.rs
use ctech_common::{HostContext, LoadError, RouteTable, SkippedUnit, UnitLoader};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::info;

use crate::unit_registry::UnitRegistry;

/// Owns unit discovery and the routes the active units expose.
///
/// Built once at startup and handed to whoever needs it; there is no global
/// instance. Discovery passes are serialized.
pub struct Bridge {
    host: HostContext,
    loader: UnitLoader,
    registry: UnitRegistry,
    routes: RwLock<Arc<RouteTable>>,
    skipped: RwLock<Vec<SkippedUnit>>,
    boot_lock: Mutex<()>,
}

/// Counts from one discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSummary {
    pub loaded: usize,
    pub skipped: usize,
    pub routes: usize,
}

impl Bridge {
    pub fn new(host: HostContext, loader: UnitLoader) -> Self {
        Bridge {
            host,
            loader,
            registry: UnitRegistry::new(),
            routes: RwLock::new(Arc::new(RouteTable::new())),
            skipped: RwLock::new(Vec::new()),
            boot_lock: Mutex::new(()),
        }
    }

    /// Discover units, then rebuild the route table from the active set.
    /// On failure the previously active units and routes stay in place.
    pub fn boot(&self) -> Result<BootSummary, LoadError> {
        let _guard = self.boot_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let report = self.loader.load(&self.host)?;
        let mut routes = RouteTable::new();
        for unit in report.units.values() {
            routes.set_owner(unit.slug());
            unit.register_routes(&mut routes);
        }

        let summary = BootSummary {
            loaded: report.units.len(),
            skipped: report.skipped.len(),
            routes: routes.len(),
        };

        self.registry.replace_all(report.units);
        *self.skipped.write().unwrap_or_else(PoisonError::into_inner) = report.skipped;
        *self.routes.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(routes);

        info!(
            "Bridge ready: {} unit(s), {} route(s), {} skipped director(ies)",
            summary.loaded, summary.routes, summary.skipped
        );
        Ok(summary)
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Snapshot of the current route table.
    pub fn routes(&self) -> Arc<RouteTable> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Directories skipped by the last successful discovery pass.
    pub fn last_report(&self) -> Vec<SkippedUnit> {
        self.skipped.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
