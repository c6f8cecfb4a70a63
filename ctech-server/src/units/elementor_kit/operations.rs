// ctech-server/src/units/elementor_kit/operations.rs
use ctech_common::fields::{decode_flags, encode_flags};
use ctech_common::{extract_subset, AllowList, ApiError, HostContext, SettingsBlob, Target};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::units::surfaces::KitSurface;

/// A named slice of the kit settings with its own route.
#[derive(Debug)]
pub struct KitGroup {
    pub name: &'static str,
    pub keys: &'static [&'static str],
    /// Keys stored with the `"yes"` / `""` switch encoding.
    pub flags: &'static [&'static str],
}

impl KitGroup {
    pub fn args(&self) -> Value {
        let properties: Map<String, Value> = self
            .keys
            .iter()
            .map(|key| {
                let kind = if self.flags.contains(key) { "boolean" } else { "any" };
                (key.to_string(), json!({ "type": kind }))
            })
            .collect();
        json!({ "type": "object", "properties": properties })
    }
}

pub const GROUPS: &[KitGroup] = &[
    KitGroup {
        name: "colors",
        keys: &["system_colors", "custom_colors"],
        flags: &[],
    },
    KitGroup {
        name: "typography",
        keys: &["system_typography", "custom_typography", "default_generic_fonts"],
        flags: &[],
    },
    KitGroup {
        name: "theme-style",
        keys: &[
            "body_color",
            "body_typography_typography",
            "body_typography_font_family",
            "body_typography_font_size",
            "link_normal_color",
            "link_hover_color",
            "h1_color",
            "h1_typography_typography",
            "h1_typography_font_family",
            "h2_color",
            "h2_typography_typography",
            "h2_typography_font_family",
            "button_text_color",
            "button_background_color",
            "button_border_radius",
            "button_padding",
            "body_background_background",
            "body_background_color",
        ],
        flags: &[],
    },
    KitGroup {
        name: "layout",
        keys: &[
            "container_width",
            "space_between_widgets",
            "page_title_selector",
            "stretched_section_container",
            "default_page_template",
            "viewport_md",
            "viewport_lg",
            "global_image_lightbox",
            "lightbox_enable_counter",
            "lightbox_enable_fullscreen",
            "lightbox_enable_zoom",
            "lightbox_enable_share",
        ],
        flags: &[
            "global_image_lightbox",
            "lightbox_enable_counter",
            "lightbox_enable_fullscreen",
            "lightbox_enable_zoom",
            "lightbox_enable_share",
        ],
    },
];

pub fn get_kit(host: &HostContext) -> Result<Value, ApiError> {
    let snapshot = host.settings.read(host, &KitSurface, &Target::Active)?;
    Ok(json!({
        "kit_id": snapshot.target,
        "settings": snapshot.settings.unwrap_or_default(),
    }))
}

/// Merge an arbitrary subset of kit settings.
pub fn update_kit(host: &HostContext, body: &Value) -> Result<Value, ApiError> {
    let result = host
        .settings
        .merge_and_save(host, &KitSurface, &Target::Active, body, &AllowList::any())?;
    Ok(json!({
        "kit_id": result.target,
        "updated_fields": result.updated_fields,
        "settings": result.settings,
    }))
}

pub fn get_group(host: &HostContext, group: &KitGroup) -> Result<Value, ApiError> {
    let snapshot = host.settings.read(host, &KitSurface, &Target::Active)?;
    let stored = snapshot.settings.unwrap_or_default();
    Ok(json!({
        "kit_id": snapshot.target,
        "group": group.name,
        "settings": group_view(&stored, group),
    }))
}

/// Merge a group update; keys outside the group are ignored.
pub fn update_group(host: &HostContext, group: &KitGroup, body: &Map<String, Value>) -> Result<Value, ApiError> {
    let mut payload = body.clone();
    encode_flags(&mut payload, group.flags);

    let allow = AllowList::of(group.keys.iter().copied());
    let result = host
        .settings
        .merge_and_save(host, &KitSurface, &Target::Active, &Value::Object(payload), &allow)?;

    let ignored = body.len() - result.updated_fields.len();
    if ignored > 0 {
        info!("Ignored {} key(s) outside kit group {}", ignored, group.name);
    }

    Ok(json!({
        "kit_id": result.target,
        "group": group.name,
        "updated_fields": result.updated_fields,
        "settings": group_view(&result.settings, group),
    }))
}

fn group_view(stored: &SettingsBlob, group: &KitGroup) -> SettingsBlob {
    let mut view = extract_subset(stored, group.keys);
    decode_flags(&mut view, group.flags);
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::surfaces::{ACTIVE_KIT_OPTION, PAGE_SETTINGS_META};
    use ctech_common::{Document, MemoryStore};

    fn host_with_kit(settings: Value) -> HostContext {
        HostContext::in_memory(
            MemoryStore::new()
                .with_option(ACTIVE_KIT_OPTION, json!(7))
                .with_document(Document::new(7, "elementor_library", "Default Kit"))
                .with_meta(7, PAGE_SETTINGS_META, settings),
        )
    }

    fn group(name: &str) -> &'static KitGroup {
        GROUPS.iter().find(|g| g.name == name).unwrap()
    }

    #[test]
    fn group_read_is_a_subset_without_padding() {
        let host = host_with_kit(json!({
            "system_colors": [{ "_id": "primary", "color": "#6EC1E4" }],
            "container_width": { "size": 1140, "unit": "px" },
        }));

        let colors = get_group(&host, group("colors")).unwrap();
        assert_eq!(colors["kit_id"], 7);
        assert_eq!(
            colors["settings"],
            json!({ "system_colors": [{ "_id": "primary", "color": "#6EC1E4" }] })
        );
    }

    #[test]
    fn layout_switches_round_trip_through_sentinel() {
        let host = host_with_kit(json!({ "global_image_lightbox": "yes" }));
        let layout = group("layout");

        let before = get_group(&host, layout).unwrap();
        assert_eq!(before["settings"]["global_image_lightbox"], true);

        let body = json!({ "lightbox_enable_zoom": true, "lightbox_enable_share": false, "bogus": 1 });
        let result = update_group(&host, layout, body.as_object().unwrap()).unwrap();
        assert_eq!(result["updated_fields"], json!(["lightbox_enable_share", "lightbox_enable_zoom"]));
        assert_eq!(result["settings"]["lightbox_enable_zoom"], true);
        assert_eq!(result["settings"]["lightbox_enable_share"], false);

        let stored = host.store.get_meta(7, PAGE_SETTINGS_META).unwrap().unwrap();
        assert_eq!(stored["lightbox_enable_zoom"], "yes");
        assert_eq!(stored["lightbox_enable_share"], "");
        assert!(stored.get("bogus").is_none());
    }

    #[test]
    fn full_update_merges_shallowly() {
        let host = host_with_kit(json!({ "a": 1, "nested": { "x": 1, "y": 2 } }));
        let result = update_kit(&host, &json!({ "nested": { "x": 9 }, "b": 2 })).unwrap();
        assert_eq!(result["settings"], json!({ "a": 1, "b": 2, "nested": { "x": 9 } }));
    }

    #[test]
    fn missing_kit_is_not_found() {
        let host = HostContext::in_memory(MemoryStore::new());
        let err = get_kit(&host).unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.code(), "no_active_kit");
    }

    #[test]
    fn non_object_update_is_rejected() {
        let host = host_with_kit(json!({}));
        let err = update_kit(&host, &json!("text")).unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
