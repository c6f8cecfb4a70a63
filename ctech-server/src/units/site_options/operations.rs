// ctech-server/src/units/site_options/operations.rs
use ctech_common::{AllowList, ApiError, HostContext, SettingsError, Target};
use serde_json::{json, Value};
use tracing::debug;

use crate::units::surfaces::OptionsSurface;

/// Options readable and writable through the API unless overridden.
pub const DEFAULT_EXPOSED: &[&str] = &[
    "blogname",
    "blogdescription",
    "timezone_string",
    "date_format",
    "time_format",
    "start_of_week",
    "posts_per_page",
    "show_on_front",
    "page_on_front",
    "page_for_posts",
    "blog_public",
    "site_icon",
];

/// Option holding a replacement list of exposed option names.
pub const EXPOSED_OPTIONS_OVERRIDE: &str = "communitytech_exposed_options";

pub fn list(host: &HostContext, exposed: &[String]) -> Result<Value, ApiError> {
    let surface = OptionsSurface { exposed: exposed.to_vec() };
    let snapshot = host.settings.read(host, &surface, &Target::Site)?;
    Ok(json!({ "options": snapshot.settings.unwrap_or_default() }))
}

pub fn get_one(host: &HostContext, exposed: &[String], name: &str) -> Result<Value, ApiError> {
    if !exposed.iter().any(|e| e == name) {
        return Err(ApiError::not_found(
            "option_not_exposed",
            format!("Option {} is not exposed.", name),
        ));
    }
    match host.store.get_option(name)? {
        Some(value) => Ok(json!({ "name": name, "value": value })),
        None => Err(ApiError::not_found(
            "option_not_set",
            format!("Option {} has no value.", name),
        )),
    }
}

/// Non-exposed names in the payload are dropped. With nothing exposed,
/// nothing is writable.
pub fn update(host: &HostContext, exposed: &[String], body: &Value) -> Result<Value, ApiError> {
    if !body.is_object() {
        return Err(SettingsError::InvalidPayload("settings payload must be a JSON object".to_string()).into());
    }
    let surface = OptionsSurface { exposed: exposed.to_vec() };
    if exposed.is_empty() {
        debug!("No site options are exposed; ignoring write");
        return Ok(json!({ "updated_fields": [], "options": {} }));
    }
    let allow = AllowList::of(exposed.iter().cloned());
    let result = host
        .settings
        .merge_and_save(host, &surface, &Target::Site, body, &allow)?;
    Ok(json!({
        "updated_fields": result.updated_fields,
        "options": result.settings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctech_common::MemoryStore;

    fn exposed() -> Vec<String> {
        DEFAULT_EXPOSED.iter().map(|s| s.to_string()).collect()
    }

    fn host() -> HostContext {
        HostContext::in_memory(
            MemoryStore::new()
                .with_option("blogname", json!("Community"))
                .with_option("admin_email", json!("root@example.org")),
        )
    }

    #[test]
    fn hidden_options_are_not_listed_or_readable() {
        let host = host();
        let listed = list(&host, &exposed()).unwrap();
        assert_eq!(listed["options"], json!({ "blogname": "Community" }));

        let err = get_one(&host, &exposed(), "admin_email").unwrap_err();
        assert_eq!(err.status(), 404);

        let unset = get_one(&host, &exposed(), "site_icon").unwrap_err();
        assert_eq!(unset.code(), "option_not_set");
        assert_eq!(get_one(&host, &exposed(), "blogname").unwrap()["value"], "Community");
    }

    #[test]
    fn update_writes_only_exposed_options() {
        let host = host();
        let body = json!({ "blogdescription": "Neighbours", "admin_email": "evil@example.org" });
        let result = update(&host, &exposed(), &body).unwrap();

        assert_eq!(result["updated_fields"], json!(["blogdescription"]));
        assert_eq!(host.store.get_option("blogdescription").unwrap(), Some(json!("Neighbours")));
        assert_eq!(host.store.get_option("admin_email").unwrap(), Some(json!("root@example.org")));
    }

    #[test]
    fn empty_exposed_list_makes_nothing_writable() {
        let host = host();
        let body = json!({
            "admin_email": "evil@example.org",
            "active_plugins": [],
            "communitytech_exposed_options": ["users_can_register"],
        });
        let result = update(&host, &[], &body).unwrap();

        assert_eq!(result["updated_fields"], json!([]));
        assert_eq!(host.store.get_option("admin_email").unwrap(), Some(json!("root@example.org")));
        assert_eq!(host.store.get_option("active_plugins").unwrap(), None);
        assert_eq!(host.store.get_option(EXPOSED_OPTIONS_OVERRIDE).unwrap(), None);
    }
}
