// ctech-server/src/units/elementor_page/mod.rs
mod operations;
mod unit;

pub use unit::ElementorPageUnit;
use ctech_common::Unit;
use std::sync::Arc;

/// Create a new Elementor page unit
pub fn create_unit() -> Arc<dyn Unit> {
    Arc::new(ElementorPageUnit::new())
}
