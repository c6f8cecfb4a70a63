// ctech-server/src/units/elementor_widgets/unit.rs
use ctech_common::{Capability, HostContext, Method, RouteSpec, RouteTable, Unit, UnitError};

use crate::units::elementor_widgets::operations;
use crate::units::ELEMENTOR_PLUGIN;

pub struct ElementorWidgetsUnit {
    name: String,
    description: String,
}

impl ElementorWidgetsUnit {
    pub fn new() -> Self {
        ElementorWidgetsUnit {
            name: "Elementor Widget Registry".to_string(),
            description: "Registered Elementor widgets and their controls".to_string(),
        }
    }
}

impl Default for ElementorWidgetsUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for ElementorWidgetsUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> &str {
        "elementor-widgets"
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
        routes.add(RouteSpec::new(Method::Get, "/elementor/widgets", Capability::EditPosts, |host, _| {
            operations::list(host)
        }));
        routes.add(RouteSpec::new(Method::Get, "/elementor/widgets/{name}", Capability::EditPosts, |host, req| {
            operations::get(host, req.param("name")?)
        }));
    }
}
