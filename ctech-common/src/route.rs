// ctech-common/src/route.rs
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ApiError;
use crate::host::{Capability, HostContext};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn parse(value: &str) -> Option<Method> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed inputs of one route invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteRequest {
    /// Values bound to `{name}` placeholders.
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    /// JSON body, `Value::Null` when empty.
    pub body: Value,
}

impl RouteRequest {
    pub fn with_body(body: Value) -> Self {
        RouteRequest { body, ..Default::default() }
    }

    pub fn param(&self, name: &str) -> Result<&str, ApiError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::invalid("rest_missing_callback_param", format!("Missing parameter(s): {}", name)))
    }

    /// Positive integer path parameter (document ids).
    pub fn param_u64(&self, name: &str) -> Result<u64, ApiError> {
        let raw = self.param(name)?;
        match raw.parse::<u64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(ApiError::invalid(
                "rest_invalid_param",
                format!("Invalid parameter(s): {} must be a positive integer", name),
            )),
        }
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// The body as a JSON object; anything else is an invalid request.
    pub fn body_object(&self) -> Result<&Map<String, Value>, ApiError> {
        self.body
            .as_object()
            .ok_or_else(|| ApiError::invalid("invalid_request", "Request body must be a JSON object"))
    }
}

pub type RouteHandler =
    Arc<dyn Fn(&HostContext, &RouteRequest) -> Result<Value, ApiError> + Send + Sync>;

/// One exposed operation: (method, path pattern, handler, required capability, argument schema).
#[derive(Clone)]
pub struct RouteSpec {
    pub method: Method,
    pub pattern: String,
    pub capability: Capability,
    pub args: Value,
    /// Slug of the unit that registered the route.
    pub owner: String,
    handler: RouteHandler,
}

impl RouteSpec {
    pub fn new<F>(method: Method, pattern: &str, capability: Capability, handler: F) -> Self
    where
        F: Fn(&HostContext, &RouteRequest) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        RouteSpec {
            method,
            pattern: normalize(pattern),
            capability,
            args: Value::Null,
            owner: String::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    pub fn invoke(&self, host: &HostContext, request: &RouteRequest) -> Result<Value, ApiError> {
        (self.handler)(host, request)
    }

    fn bind(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let pattern: Vec<&str> = segments(&self.pattern).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, value) in pattern.iter().zip(actual) {
            match expected.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) => {
                    if value.is_empty() {
                        return None;
                    }
                    params.insert(name.to_string(), value.to_string());
                }
                None if *expected == value => {}
                None => return None,
            }
        }
        Some(params)
    }
}

impl fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteSpec")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("capability", &self.capability)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Summary of a route for listings.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    pub capability: Capability,
    pub owner: String,
    pub args: Value,
}

pub enum RouteMatch<'a> {
    Found {
        route: &'a RouteSpec,
        params: BTreeMap<String, String>,
    },
    /// The path exists but not for this method.
    MethodNotAllowed,
    NotFound,
}

/// All routes exposed by the active units.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<RouteSpec>,
    owner: String,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes added after this call are attributed to `owner`.
    pub fn set_owner(&mut self, owner: &str) {
        self.owner = owner.to_string();
    }

    pub fn add(&mut self, mut route: RouteSpec) {
        route.owner = self.owner.clone();
        self.routes.push(route);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteSpec> {
        self.routes.iter()
    }

    pub fn infos(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|r| RouteInfo {
                method: r.method,
                path: r.pattern.clone(),
                capability: r.capability,
                owner: r.owner.clone(),
                args: r.args.clone(),
            })
            .collect()
    }

    /// Literal segments win over placeholders, so `/seo/audit` is not bound as `/seo/{id}`.
    pub fn find(&self, method: Method, path: &str) -> RouteMatch<'_> {
        let path = normalize(path);
        let mut path_matched = false;
        let mut best: Option<(&RouteSpec, BTreeMap<String, String>)> = None;

        for route in &self.routes {
            let Some(params) = route.bind(&path) else {
                continue;
            };
            path_matched = true;
            if route.method != method {
                continue;
            }
            let better = match &best {
                Some((_, current)) => params.len() < current.len(),
                None => true,
            };
            if better {
                best = Some((route, params));
            }
        }

        match best {
            Some((route, params)) => RouteMatch::Found { route, params },
            None if path_matched => RouteMatch::MethodNotAllowed,
            None => RouteMatch::NotFound,
        }
    }
}

fn normalize(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> RouteTable {
        let mut table = RouteTable::new();
        table.set_owner("seo-meta");
        table.add(RouteSpec::new(Method::Get, "/seo/{id}", Capability::EditPosts, |_, req| {
            Ok(json!({ "id": req.param_u64("id")? }))
        }));
        table.add(RouteSpec::new(Method::Get, "seo/audit", Capability::EditPosts, |_, _| {
            Ok(json!("audit"))
        }));
        table.add(RouteSpec::new(Method::Post, "/seo/{id}", Capability::ManageOptions, |_, _| {
            Ok(json!("post"))
        }));
        table
    }

    #[test]
    fn binds_placeholders() {
        let table = table();
        match table.find(Method::Get, "/seo/42/") {
            RouteMatch::Found { route, params } => {
                assert_eq!(route.pattern, "/seo/{id}");
                assert_eq!(route.owner, "seo-meta");
                assert_eq!(params.get("id").map(String::as_str), Some("42"));
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn literal_segments_beat_placeholders() {
        let table = table();
        match table.find(Method::Get, "/seo/audit") {
            RouteMatch::Found { route, params } => {
                assert_eq!(route.pattern, "/seo/audit");
                assert!(params.is_empty());
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn distinguishes_wrong_method_from_unknown_path() {
        let table = table();
        assert!(matches!(table.find(Method::Delete, "/seo/1"), RouteMatch::MethodNotAllowed));
        assert!(matches!(table.find(Method::Get, "/nope"), RouteMatch::NotFound));
        assert!(matches!(table.find(Method::Get, "/seo/1/extra"), RouteMatch::NotFound));
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let mut request = RouteRequest::default();
        request.params.insert("id".into(), "abc".into());
        let err = request.param_u64("id").unwrap_err();
        assert_eq!(err.status(), 400);

        request.params.insert("id".into(), "0".into());
        assert!(request.param_u64("id").is_err());
    }

    #[test]
    fn non_object_body_is_invalid() {
        let request = RouteRequest::with_body(json!([1, 2]));
        assert_eq!(request.body_object().unwrap_err().status(), 400);
    }
}
