// ctech-server/src/units/elementor_kit/mod.rs
mod operations;
mod unit;

pub use operations::{KitGroup, GROUPS};
pub use unit::ElementorKitUnit;
use ctech_common::Unit;
use std::sync::Arc;

/// Create a new Elementor kit unit
pub fn create_unit() -> Arc<dyn Unit> {
    Arc::new(ElementorKitUnit::new())
}
