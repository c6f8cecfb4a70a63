// ctech-server/src/units/seo_meta/unit.rs
use ctech_common::{Capability, HostContext, Method, RouteSpec, RouteTable, Unit, UnitError};
use serde_json::{json, Map, Value};

use crate::units::seo_meta::operations::{self, SEO_FIELDS};

pub struct SeoMetaUnit {
    name: String,
    description: String,
}

impl SeoMetaUnit {
    pub fn new() -> Self {
        SeoMetaUnit {
            name: "SEO Metadata".to_string(),
            description: "Per-document SEO fields and a site-wide audit".to_string(),
        }
    }
}

impl Default for SeoMetaUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for SeoMetaUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> &str {
        "seo-meta"
    }

    fn description(&self) -> &str {
        &self.description
    }

    /// Stores its fields in plain document meta, so it needs nothing else.
    fn is_available(&self, _host: &HostContext) -> bool {
        true
    }

    fn init(&self, _host: &HostContext) -> Result<(), UnitError> {
        Ok(())
    }

    fn register_routes(&self, routes: &mut RouteTable) {
        let fields: Map<String, Value> = SEO_FIELDS
            .fields()
            .iter()
            .map(|f| {
                let kind = match f.kind {
                    ctech_common::FieldKind::Text => "string",
                    ctech_common::FieldKind::Flag => "boolean",
                };
                (f.friendly.to_string(), json!({ "type": kind }))
            })
            .collect();

        routes.add(
            RouteSpec::new(Method::Get, "/seo/audit", Capability::EditPosts, |host, req| {
                operations::audit(host, req.query("post_type"))
            })
            .with_args(json!({ "post_type": { "type": "string", "required": false } })),
        );
        routes.add(RouteSpec::new(Method::Get, "/seo/{id}", Capability::EditPosts, |host, req| {
            operations::get_seo(host, req.param_u64("id")?)
        }));
        routes.add(
            RouteSpec::new(Method::Post, "/seo/{id}", Capability::ManageOptions, |host, req| {
                operations::update_seo(host, req.param_u64("id")?, req.body_object()?)
            })
            .with_args(Value::Object(fields)),
        );
    }
}
