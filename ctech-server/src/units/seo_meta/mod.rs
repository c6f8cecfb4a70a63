// ctech-server/src/units/seo_meta/mod.rs
mod audit;
mod operations;
mod unit;

pub use audit::{audit_document, AuditIssue};
pub use operations::SEO_FIELDS;
pub use unit::SeoMetaUnit;
use ctech_common::Unit;
use std::sync::Arc;

/// Create a new SEO meta unit
pub fn create_unit() -> Arc<dyn Unit> {
    Arc::new(SeoMetaUnit::new())
}
