// ctech-server/src/units/elementor_widgets/mod.rs
mod operations;
mod unit;

pub use operations::summarize;
pub use unit::ElementorWidgetsUnit;
use ctech_common::Unit;
use std::sync::Arc;

/// Create a new Elementor widgets unit
pub fn create_unit() -> Arc<dyn Unit> {
    Arc::new(ElementorWidgetsUnit::new())
}
