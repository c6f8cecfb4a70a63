// ctech-common/src/unit.rs
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::UnitError;
use crate::host::HostContext;
use crate::route::RouteTable;

/// Introspection record for one unit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    pub name: String,
    pub slug: String,
    pub available: bool,
    pub description: String,
}

/// Trait every loadable unit implements
pub trait Unit: Send + Sync {
    /// Human-readable display name
    fn name(&self) -> &str;

    /// Stable identifier: lowercase, hyphen-separated, unique
    fn slug(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Whether the unit's host dependencies are present. Must not mutate
    /// anything: the loader may call it without following up with `init`.
    fn is_available(&self, host: &HostContext) -> bool;

    /// Called exactly once, and only after `is_available` returned true.
    /// An error here aborts the whole load pass.
    fn init(&self, host: &HostContext) -> Result<(), UnitError>;

    /// Expose this unit's operations. Called once per route rebuild.
    fn register_routes(&self, routes: &mut RouteTable) {
        let _ = routes;
    }

    fn info(&self, host: &HostContext) -> UnitInfo {
        UnitInfo {
            name: self.name().to_string(),
            slug: self.slug().to_string(),
            available: self.is_available(host),
            description: self.description().to_string(),
        }
    }
}

/// Builds a unit with no constructor arguments.
pub type UnitFactory = fn() -> Arc<dyn Unit>;

/// Non-empty, lowercase ASCII letters and digits, single hyphens between segments.
pub fn validate_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.split('-').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}
