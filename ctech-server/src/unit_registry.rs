// ctech-server/src/unit_registry.rs

use ctech_common::{HostContext, Unit, UnitInfo};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry that holds the active units, keyed by slug
#[derive(Default)]
pub struct UnitRegistry {
    units: RwLock<BTreeMap<String, Arc<dyn Unit>>>,
}

impl UnitRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every active unit with the result of a load pass
    pub fn replace_all(&self, units: BTreeMap<String, Arc<dyn Unit>>) {
        let mut current = self.units.write().unwrap_or_else(PoisonError::into_inner);
        *current = units;
    }

    /// Get a unit by slug
    pub fn get_unit(&self, slug: &str) -> Option<Arc<dyn Unit>> {
        let units = self.units.read().unwrap_or_else(PoisonError::into_inner);
        units.get(slug).cloned()
    }

    /// Get all active units, ordered by slug
    pub fn get_all_units(&self) -> Vec<Arc<dyn Unit>> {
        let units = self.units.read().unwrap_or_else(PoisonError::into_inner);
        units.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.units.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn infos(&self, host: &HostContext) -> Vec<UnitInfo> {
        self.get_all_units().iter().map(|unit| unit.info(host)).collect()
    }
}
