// ctech-server/src/units/elementor_page/unit.rs
use ctech_common::{Capability, HostContext, Method, RouteSpec, RouteTable, Unit, UnitError};
use serde_json::json;

use crate::units::elementor_page::operations;
use crate::units::ELEMENTOR_PLUGIN;

pub struct ElementorPageUnit {
    name: String,
    description: String,
}

impl ElementorPageUnit {
    pub fn new() -> Self {
        ElementorPageUnit {
            name: "Elementor Page Settings".to_string(),
            description: "Per-page Elementor settings and element data".to_string(),
        }
    }
}

impl Default for ElementorPageUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for ElementorPageUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> &str {
        "elementor-page"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_available(&self, host: &HostContext) -> bool {
        host.is_plugin_active(ELEMENTOR_PLUGIN)
    }

    fn init(&self, _host: &HostContext) -> Result<(), UnitError> {
        Ok(())
    }

    fn register_routes(&self, routes: &mut RouteTable) {
        let id_arg = json!({ "id": { "type": "integer", "required": true } });

        routes.add(
            RouteSpec::new(Method::Get, "/elementor/page/{id}/settings", Capability::EditPosts, |host, req| {
                operations::get_settings(host, req.param_u64("id")?)
            })
            .with_args(id_arg.clone()),
        );
        routes.add(
            RouteSpec::new(Method::Post, "/elementor/page/{id}/settings", Capability::ManageOptions, |host, req| {
                operations::update_settings(host, req.param_u64("id")?, req.body_object()?)
            })
            .with_args(id_arg.clone()),
        );
        routes.add(
            RouteSpec::new(Method::Get, "/elementor/page/{id}/data", Capability::EditPosts, |host, req| {
                operations::get_data(host, req.param_u64("id")?)
            })
            .with_args(id_arg.clone()),
        );
        routes.add(
            RouteSpec::new(Method::Post, "/elementor/page/{id}/data", Capability::ManageOptions, |host, req| {
                operations::replace_data(host, req.param_u64("id")?, req.body_object()?)
            })
            .with_args(json!({
                "id": { "type": "integer", "required": true },
                "data": { "type": "array", "required": true },
            })),
        );
    }
}
