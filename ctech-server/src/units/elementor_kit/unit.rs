// ctech-server/src/units/elementor_kit/unit.rs
use ctech_common::{Capability, HostContext, Method, RouteSpec, RouteTable, Unit, UnitError};
use serde_json::json;
use tracing::info;

use crate::units::elementor_kit::operations::{self, GROUPS};
use crate::units::ELEMENTOR_PLUGIN;

pub struct ElementorKitUnit {
    name: String,
    description: String,
}

impl ElementorKitUnit {
    pub fn new() -> Self {
        ElementorKitUnit {
            name: "Elementor Kit".to_string(),
            description: "Read and update global design settings of the active Elementor kit".to_string(),
        }
    }
}

impl Default for ElementorKitUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for ElementorKitUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> &str {
        "elementor-kit"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_available(&self, host: &HostContext) -> bool {
        host.is_plugin_active(ELEMENTOR_PLUGIN)
    }

    fn init(&self, _host: &HostContext) -> Result<(), UnitError> {
        info!("Elementor kit unit ready with {} setting group(s)", GROUPS.len());
        Ok(())
    }

    fn register_routes(&self, routes: &mut RouteTable) {
        routes.add(RouteSpec::new(Method::Get, "/elementor/kit", Capability::EditPosts, |host, _| {
            operations::get_kit(host)
        }));
        routes.add(
            RouteSpec::new(Method::Post, "/elementor/kit", Capability::ManageOptions, |host, req| {
                operations::update_kit(host, &req.body)
            })
            .with_args(json!({ "type": "object", "description": "Kit settings to merge" })),
        );

        for group in GROUPS {
            let path = format!("/elementor/kit/{}", group.name);
            routes.add(RouteSpec::new(Method::Get, &path, Capability::EditPosts, move |host, _| {
                operations::get_group(host, group)
            }));
            routes.add(
                RouteSpec::new(Method::Post, &path, Capability::ManageOptions, move |host, req| {
                    operations::update_group(host, group, req.body_object()?)
                })
                .with_args(group.args()),
            );
        }
    }
}
