// ctech-server/src/units/site_options/unit.rs
use ctech_common::{Capability, HostContext, Method, RouteSpec, RouteTable, Unit, UnitError};
use serde_json::{json, Value};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use crate::units::site_options::operations::{self, DEFAULT_EXPOSED, EXPOSED_OPTIONS_OVERRIDE};

pub struct SiteOptionsUnit {
    name: String,
    description: String,
    exposed: Arc<RwLock<Vec<String>>>,
}

impl SiteOptionsUnit {
    pub fn new() -> Self {
        SiteOptionsUnit {
            name: "Site Options".to_string(),
            description: "Allow-listed general site options".to_string(),
            exposed: Arc::new(RwLock::new(
                DEFAULT_EXPOSED.iter().map(|s| s.to_string()).collect(),
            )),
        }
    }

    pub fn exposed(&self) -> Vec<String> {
        self.exposed.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for SiteOptionsUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for SiteOptionsUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> &str {
        "site-options"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_available(&self, _host: &HostContext) -> bool {
        true
    }

    /// An array of option names stored under the override option replaces
    /// the default list.
    fn init(&self, host: &HostContext) -> Result<(), UnitError> {
        let names = match host.store.get_option(EXPOSED_OPTIONS_OVERRIDE)? {
            Some(Value::Array(items)) => {
                let names: Vec<String> = items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if names.len() != items.len() {
                    warn!("Ignoring non-string entries in {}", EXPOSED_OPTIONS_OVERRIDE);
                }
                names
            }
            Some(_) => {
                return Err(UnitError::Init(format!(
                    "{} must be an array of option names",
                    EXPOSED_OPTIONS_OVERRIDE
                )))
            }
            None => return Ok(()),
        };

        if names.is_empty() {
            warn!("{} lists no option names; site options are read-only and empty", EXPOSED_OPTIONS_OVERRIDE);
        } else {
            info!("Exposing {} site option(s) from {}", names.len(), EXPOSED_OPTIONS_OVERRIDE);
        }
        *self.exposed.write().unwrap_or_else(PoisonError::into_inner) = names;
        Ok(())
    }

    fn register_routes(&self, routes: &mut RouteTable) {
        let exposed = Arc::clone(&self.exposed);
        routes.add(RouteSpec::new(Method::Get, "/options", Capability::ManageOptions, move |host, _| {
            operations::list(host, &snapshot(&exposed))
        }));

        let exposed = Arc::clone(&self.exposed);
        routes.add(RouteSpec::new(Method::Get, "/options/{name}", Capability::ManageOptions, move |host, req| {
            operations::get_one(host, &snapshot(&exposed), req.param("name")?)
        }));

        let exposed = Arc::clone(&self.exposed);
        routes.add(
            RouteSpec::new(Method::Post, "/options", Capability::ManageOptions, move |host, req| {
                operations::update(host, &snapshot(&exposed), &req.body)
            })
            .with_args(json!({ "type": "object", "description": "Option name to new value" })),
        );
    }
}

fn snapshot(exposed: &RwLock<Vec<String>>) -> Vec<String> {
    exposed.read().unwrap_or_else(PoisonError::into_inner).clone()
}
