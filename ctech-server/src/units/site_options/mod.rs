// ctech-server/src/units/site_options/mod.rs
mod operations;
mod unit;

pub use operations::{DEFAULT_EXPOSED, EXPOSED_OPTIONS_OVERRIDE};
pub use unit::SiteOptionsUnit;
use ctech_common::Unit;
use std::sync::Arc;

/// Create a new site options unit
pub fn create_unit() -> Arc<dyn Unit> {
    Arc::new(SiteOptionsUnit::new())
}
