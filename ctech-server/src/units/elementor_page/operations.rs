// ctech-server/src/units/elementor_page/operations.rs
use ctech_common::fields::{decode_flags, encode_flags};
use ctech_common::{AllowList, ApiError, HostContext, Target};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::units::surfaces::{existing_document, DocumentMetaSurface, CSS_META, PAGE_SETTINGS_META};

/// Element tree of a page.
pub const DATA_META: &str = "_elementor_data";
pub const EDIT_MODE_META: &str = "_elementor_edit_mode";

const FLAGS: &[&str] = &["hide_title"];

const SETTINGS: DocumentMetaSurface = DocumentMetaSurface {
    meta_key: PAGE_SETTINGS_META,
    flushes_css: true,
};

pub fn get_settings(host: &HostContext, id: u64) -> Result<Value, ApiError> {
    let snapshot = host.settings.read(host, &SETTINGS, &Target::Document(id))?;
    let mut settings = snapshot.settings.unwrap_or_default();
    decode_flags(&mut settings, FLAGS);
    Ok(json!({ "post_id": snapshot.target, "settings": settings }))
}

pub fn update_settings(host: &HostContext, id: u64, body: &Map<String, Value>) -> Result<Value, ApiError> {
    let mut payload = body.clone();
    encode_flags(&mut payload, FLAGS);

    let result = host.settings.merge_and_save(
        host,
        &SETTINGS,
        &Target::Document(id),
        &Value::Object(payload),
        &AllowList::any(),
    )?;
    let mut settings = result.settings;
    decode_flags(&mut settings, FLAGS);
    Ok(json!({
        "post_id": result.target,
        "updated_fields": result.updated_fields,
        "settings": settings,
    }))
}

/// Stored element data may be a JSON-encoded string; it is returned decoded.
pub fn get_data(host: &HostContext, id: u64) -> Result<Value, ApiError> {
    let id = existing_document(host, &Target::Document(id))?;
    let data = match host.store.get_meta(id, DATA_META)? {
        Some(Value::String(raw)) => serde_json::from_str(&raw).map_err(|e| {
            ApiError::internal(format!("Stored element data of {} is not valid JSON: {}", id, e))
        })?,
        Some(value) => value,
        None => json!([]),
    };
    Ok(json!({ "post_id": id, "data": data }))
}

/// Replace the whole element tree and switch the page to builder mode.
pub fn replace_data(host: &HostContext, id: u64, body: &Map<String, Value>) -> Result<Value, ApiError> {
    let elements = match body.get("data") {
        Some(Value::Array(elements)) => elements.clone(),
        _ => return Err(ApiError::invalid("invalid_request", "`data` must be an array of elements")),
    };
    let id = existing_document(host, &Target::Document(id))?;

    let count = elements.len();
    host.store.set_meta(id, DATA_META, Value::Array(elements))?;
    host.store.set_meta(id, EDIT_MODE_META, json!("builder"))?;
    info!("Replaced element data of document {} ({} top-level element(s))", id, count);

    let flushed = host
        .store
        .delete_meta(id, CSS_META)
        .map_err(|e| ctech_common::CacheError(e.to_string()))
        .and_then(|_| host.cache.flush_document(id));
    if let Err(e) = flushed {
        warn!("Cache invalidation failed for document {} (write kept): {}", id, e);
    }

    Ok(json!({
        "post_id": id,
        "updated_fields": [DATA_META, EDIT_MODE_META],
        "elements": count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctech_common::{Document, MemoryStore};

    fn host() -> HostContext {
        HostContext::in_memory(
            MemoryStore::new()
                .with_document(Document::new(12, "page", "About"))
                .with_meta(12, PAGE_SETTINGS_META, json!({ "hide_title": "yes", "template": "default" }))
                .with_meta(12, CSS_META, json!({ "status": "file" })),
        )
    }

    #[test]
    fn settings_decode_hide_title() {
        let result = get_settings(&host(), 12).unwrap();
        assert_eq!(result["settings"], json!({ "hide_title": true, "template": "default" }));
    }

    #[test]
    fn settings_update_encodes_hide_title_and_flushes_css() {
        let host = host();
        let body = json!({ "hide_title": false });
        let result = update_settings(&host, 12, body.as_object().unwrap()).unwrap();
        assert_eq!(result["settings"]["hide_title"], false);
        assert_eq!(
            host.store.get_meta(12, PAGE_SETTINGS_META).unwrap().unwrap()["hide_title"],
            ""
        );
        assert_eq!(host.store.get_meta(12, CSS_META).unwrap(), None);
    }

    #[test]
    fn unknown_document_is_not_found() {
        let err = get_settings(&host(), 99).unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.code(), "rest_post_invalid_id");
    }

    #[test]
    fn data_replacement_sets_builder_mode() {
        let host = host();
        let body = json!({ "data": [{ "id": "a1", "elType": "section", "elements": [] }] });
        let result = replace_data(&host, 12, body.as_object().unwrap()).unwrap();
        assert_eq!(result["elements"], 1);
        assert_eq!(result["updated_fields"], json!([DATA_META, EDIT_MODE_META]));
        assert_eq!(host.store.get_meta(12, EDIT_MODE_META).unwrap(), Some(json!("builder")));

        let read = get_data(&host, 12).unwrap();
        assert_eq!(read["data"][0]["elType"], "section");
    }

    #[test]
    fn string_encoded_data_is_decoded() {
        let host = HostContext::in_memory(
            MemoryStore::new()
                .with_document(Document::new(3, "page", "Home"))
                .with_meta(3, DATA_META, json!(r#"[{"id":"x"}]"#)),
        );
        assert_eq!(get_data(&host, 3).unwrap()["data"], json!([{ "id": "x" }]));
    }

    #[test]
    fn data_must_be_an_array() {
        let body = json!({ "data": { "id": "a1" } });
        let err = replace_data(&host(), 12, body.as_object().unwrap()).unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
