// ctech-server/src/units/seo_meta/operations.rs
use chrono::Utc;
use ctech_common::{ApiError, FieldMap, FieldSpec, HostContext, Target};
use serde_json::{json, Map, Value};

use crate::units::seo_meta::audit::audit_document;
use crate::units::surfaces::DocumentMetaSurface;

pub const SEO_META: &str = "_communitytech_seo";

const SPECS: &[FieldSpec] = &[
    FieldSpec::text("title", "seo_title"),
    FieldSpec::text("description", "meta_description"),
    FieldSpec::text("focus_keyword", "focus_keyword"),
    FieldSpec::text("canonical", "canonical_url"),
    FieldSpec::text("og_title", "og_title"),
    FieldSpec::text("og_description", "og_description"),
    FieldSpec::text("og_image", "og_image_url"),
    FieldSpec::flag("noindex", "robots_noindex"),
    FieldSpec::flag("nofollow", "robots_nofollow"),
];

/// Friendly request names to stored keys.
pub const SEO_FIELDS: FieldMap = FieldMap::new(SPECS);

const SURFACE: DocumentMetaSurface = DocumentMetaSurface {
    meta_key: SEO_META,
    flushes_css: false,
};

/// Post types audited when the caller does not name one.
const DEFAULT_AUDIT_TYPES: &[&str] = &["page", "post"];

pub fn get_seo(host: &HostContext, id: u64) -> Result<Value, ApiError> {
    let snapshot = host.settings.read(host, &SURFACE, &Target::Document(id))?;
    let stored = snapshot.settings.unwrap_or_default();
    Ok(json!({ "post_id": snapshot.target, "seo": SEO_FIELDS.to_friendly(&stored) }))
}

pub fn update_seo(host: &HostContext, id: u64, body: &Map<String, Value>) -> Result<Value, ApiError> {
    let payload = SEO_FIELDS.to_storage(body);
    let allow = SEO_FIELDS.storage_allow_list();
    let result = host
        .settings
        .merge_and_save(host, &SURFACE, &Target::Document(id), &Value::Object(payload), &allow)?;

    let updated: Vec<&str> = result
        .updated_fields
        .iter()
        .filter_map(|key| SEO_FIELDS.friendly_name(key))
        .collect();
    Ok(json!({
        "post_id": result.target,
        "updated_fields": updated,
        "seo": SEO_FIELDS.to_friendly(&result.settings),
    }))
}

/// Check every published document of the selected type(s).
pub fn audit(host: &HostContext, post_type: Option<&str>) -> Result<Value, ApiError> {
    let documents = host.store.documents()?;
    let mut checked = 0;
    let mut findings = Vec::new();

    for doc in documents.iter().filter(|d| d.status == "publish") {
        let selected = match post_type {
            Some(wanted) => doc.post_type == wanted,
            None => DEFAULT_AUDIT_TYPES.contains(&doc.post_type.as_str()),
        };
        if !selected {
            continue;
        }
        checked += 1;

        let stored = match host.store.get_meta(doc.id, SEO_META)? {
            Some(Value::Object(blob)) => blob,
            _ => Map::new(),
        };
        let issues = audit_document(&SEO_FIELDS.to_friendly(&stored));
        if !issues.is_empty() {
            findings.push(json!({
                "id": doc.id,
                "title": doc.title,
                "post_type": doc.post_type,
                "issues": issues,
            }));
        }
    }

    Ok(json!({
        "checked_at": Utc::now().to_rfc3339(),
        "checked": checked,
        "with_issues": findings.len(),
        "documents": findings,
    }))
}
