// ctech-server/src/units/mod.rs

pub mod elementor_kit;
pub mod elementor_page;
pub mod elementor_widgets;
pub mod seo_meta;
pub mod site_options;
pub mod surfaces;

use ctech_common::UnitCatalog;

/// Plugin file whose activation gates the page-builder units.
pub const ELEMENTOR_PLUGIN: &str = "elementor/elementor.php";

/// Every unit this server can instantiate, keyed by type name.
pub fn catalog() -> UnitCatalog {
    UnitCatalog::default()
        .register("elementor-kit", elementor_kit::create_unit)
        .register("elementor-page", elementor_page::create_unit)
        .register("elementor-widgets", elementor_widgets::create_unit)
        .register("seo-meta", seo_meta::create_unit)
        .register("site-options", site_options::create_unit)
}
