// ctech-server/src/units/surfaces.rs
//! Storage bindings shared by the settings-bearing units.

use ctech_common::{
    CacheError, HostContext, SettingsBlob, SettingsError, SettingsSurface, Target,
};
use serde_json::{json, Value};
use tracing::warn;

/// Option naming the active design kit document.
pub const ACTIVE_KIT_OPTION: &str = "elementor_active_kit";
/// Meta key of page-builder document settings (kits and pages alike).
pub const PAGE_SETTINGS_META: &str = "_elementor_page_settings";
/// Meta key referencing the rendered CSS artifact of a document.
pub const CSS_META: &str = "_elementor_css";

fn invalid_post() -> SettingsError {
    SettingsError::TargetNotFound {
        code: "rest_post_invalid_id".into(),
        message: "Invalid post ID.".into(),
    }
}

/// Resolve `Target::Document` to an existing document id.
pub fn existing_document(host: &HostContext, target: &Target) -> Result<u64, SettingsError> {
    match target {
        Target::Document(id) => match host.store.document(*id)? {
            Some(doc) if doc.status != "trash" => Ok(doc.id),
            _ => Err(invalid_post()),
        },
        _ => Err(invalid_post()),
    }
}

fn load_blob(host: &HostContext, document: u64, key: &str) -> Result<Option<SettingsBlob>, SettingsError> {
    match host.store.get_meta(document, key)? {
        Some(Value::Object(blob)) => Ok(Some(blob)),
        Some(other) => {
            warn!(
                "Meta {} on document {} is not an object ({}); treating as empty",
                key,
                document,
                type_name(&other)
            );
            Ok(None)
        }
        None => Ok(None),
    }
}

fn persist_blob(host: &HostContext, document: u64, key: &str, blob: &SettingsBlob) -> Result<(), SettingsError> {
    host.store.set_meta(document, key, Value::Object(blob.clone()))?;
    Ok(())
}

/// Drop the document's CSS reference so the page builder regenerates it.
fn drop_css_reference(host: &HostContext, document: u64) -> Result<(), CacheError> {
    host.store
        .delete_meta(document, CSS_META)
        .map(|_| ())
        .map_err(|e| CacheError(e.to_string()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Settings of the active design kit.
pub struct KitSurface;

impl KitSurface {
    fn active_kit(host: &HostContext) -> Result<u64, SettingsError> {
        let id = match host.store.get_option(ACTIVE_KIT_OPTION)? {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        if id == 0 {
            return Err(SettingsError::NoActiveTarget {
                code: "no_active_kit".into(),
                message: "No active Elementor kit found.".into(),
            });
        }
        match host.store.document(id)? {
            Some(_) => Ok(id),
            None => Err(SettingsError::TargetNotFound {
                code: "kit_not_found".into(),
                message: format!("Active kit {} does not exist.", id),
            }),
        }
    }
}

impl SettingsSurface for KitSurface {
    type Location = u64;

    fn resolve(&self, host: &HostContext, target: &Target) -> Result<u64, SettingsError> {
        match target {
            Target::Active => Self::active_kit(host),
            other => existing_document(host, other),
        }
    }

    fn load(&self, host: &HostContext, kit: &u64) -> Result<Option<SettingsBlob>, SettingsError> {
        load_blob(host, *kit, PAGE_SETTINGS_META)
    }

    fn persist(&self, host: &HostContext, kit: &u64, blob: &SettingsBlob) -> Result<(), SettingsError> {
        persist_blob(host, *kit, PAGE_SETTINGS_META, blob)
    }

    /// Kit settings restyle every page, so all rendered CSS goes.
    fn invalidate(&self, host: &HostContext, kit: &u64) -> Result<(), CacheError> {
        drop_css_reference(host, *kit)?;
        host.cache.flush_all()
    }

    fn target_id(&self, kit: &u64) -> Value {
        json!(kit)
    }

    fn lock_key(&self, kit: &u64) -> String {
        format!("meta:{}:{}", kit, PAGE_SETTINGS_META)
    }
}

/// A JSON object stored under one meta key of a document.
pub struct DocumentMetaSurface {
    pub meta_key: &'static str,
    /// Whether writes invalidate the document's rendered CSS.
    pub flushes_css: bool,
}

impl SettingsSurface for DocumentMetaSurface {
    type Location = u64;

    fn resolve(&self, host: &HostContext, target: &Target) -> Result<u64, SettingsError> {
        existing_document(host, target)
    }

    fn load(&self, host: &HostContext, document: &u64) -> Result<Option<SettingsBlob>, SettingsError> {
        load_blob(host, *document, self.meta_key)
    }

    fn persist(&self, host: &HostContext, document: &u64, blob: &SettingsBlob) -> Result<(), SettingsError> {
        persist_blob(host, *document, self.meta_key, blob)
    }

    fn invalidate(&self, host: &HostContext, document: &u64) -> Result<(), CacheError> {
        if !self.flushes_css {
            return Ok(());
        }
        drop_css_reference(host, *document)?;
        host.cache.flush_document(*document)
    }

    fn target_id(&self, document: &u64) -> Value {
        json!(document)
    }

    fn lock_key(&self, document: &u64) -> String {
        format!("meta:{}:{}", document, self.meta_key)
    }
}

/// A fixed set of site options viewed as one blob.
pub struct OptionsSurface {
    pub exposed: Vec<String>,
}

impl SettingsSurface for OptionsSurface {
    type Location = ();

    fn resolve(&self, _host: &HostContext, _target: &Target) -> Result<(), SettingsError> {
        Ok(())
    }

    fn load(&self, host: &HostContext, _: &()) -> Result<Option<SettingsBlob>, SettingsError> {
        let mut blob = SettingsBlob::new();
        for name in &self.exposed {
            if let Some(value) = host.store.get_option(name)? {
                blob.insert(name.clone(), value);
            }
        }
        Ok(Some(blob))
    }

    /// Writes only options whose stored value differs. Options are stored one
    /// at a time, so a failure part way through restores the ones already
    /// written in this pass before reporting the error.
    fn persist(&self, host: &HostContext, _: &(), blob: &SettingsBlob) -> Result<(), SettingsError> {
        let mut written: Vec<(&str, Option<Value>)> = Vec::new();
        for (name, value) in blob {
            let step = host.store.get_option(name).and_then(|previous| {
                if previous.as_ref() == Some(value) {
                    return Ok(());
                }
                host.store.set_option(name, value.clone())?;
                written.push((name.as_str(), previous));
                Ok(())
            });
            if let Err(e) = step {
                rollback_options(host, written);
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn target_id(&self, _: &()) -> Value {
        json!("site")
    }

    fn lock_key(&self, _: &()) -> String {
        "options".to_string()
    }
}

fn rollback_options(host: &HostContext, written: Vec<(&str, Option<Value>)>) {
    for (name, previous) in written.into_iter().rev() {
        let restored = match previous {
            Some(value) => host.store.set_option(name, value),
            None => host.store.delete_option(name).map(|_| ()),
        };
        if let Err(e) = restored {
            warn!("Could not restore option {} after a failed write: {}", name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctech_common::host::{KeyValueStore, NoopCache, StaticWidgetCatalog};
    use ctech_common::{AllowList, Document, MemoryStore, StoreError};
    use std::sync::Arc;

    /// Refuses to store one option name; everything else goes to memory.
    struct RefusingStore {
        inner: MemoryStore,
        refused: &'static str,
    }

    impl KeyValueStore for RefusingStore {
        fn get_option(&self, name: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get_option(name)
        }
        fn set_option(&self, name: &str, value: Value) -> Result<(), StoreError> {
            if name == self.refused {
                return Err(StoreError(format!("disk full writing {}", name)));
            }
            self.inner.set_option(name, value)
        }
        fn delete_option(&self, name: &str) -> Result<bool, StoreError> {
            self.inner.delete_option(name)
        }
        fn get_meta(&self, document: u64, key: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get_meta(document, key)
        }
        fn set_meta(&self, document: u64, key: &str, value: Value) -> Result<(), StoreError> {
            self.inner.set_meta(document, key, value)
        }
        fn delete_meta(&self, document: u64, key: &str) -> Result<bool, StoreError> {
            self.inner.delete_meta(document, key)
        }
        fn document(&self, id: u64) -> Result<Option<Document>, StoreError> {
            self.inner.document(id)
        }
        fn documents(&self) -> Result<Vec<Document>, StoreError> {
            self.inner.documents()
        }
    }

    #[test]
    fn kit_resolution_errors_are_distinct() {
        let host = HostContext::in_memory(MemoryStore::new());
        let err = KitSurface.resolve(&host, &Target::Active).unwrap_err();
        assert!(matches!(err, SettingsError::NoActiveTarget { .. }));

        let host = HostContext::in_memory(MemoryStore::new().with_option(ACTIVE_KIT_OPTION, json!("9")));
        let err = KitSurface.resolve(&host, &Target::Active).unwrap_err();
        assert!(matches!(err, SettingsError::TargetNotFound { .. }));

        let host = HostContext::in_memory(
            MemoryStore::new()
                .with_option(ACTIVE_KIT_OPTION, json!("9"))
                .with_document(Document::new(9, "elementor_library", "Default Kit")),
        );
        assert_eq!(KitSurface.resolve(&host, &Target::Active).unwrap(), 9);
    }

    #[test]
    fn kit_write_drops_css_reference() {
        let host = HostContext::in_memory(
            MemoryStore::new()
                .with_option(ACTIVE_KIT_OPTION, json!(9))
                .with_document(Document::new(9, "elementor_library", "Default Kit"))
                .with_meta(9, CSS_META, json!({"status": "file"})),
        );

        host.settings
            .merge_and_save(&host, &KitSurface, &Target::Active, &json!({"container_width": 1140}), &AllowList::any())
            .unwrap();

        assert_eq!(host.store.get_meta(9, CSS_META).unwrap(), None);
    }

    #[test]
    fn trashed_documents_do_not_resolve() {
        let mut doc = Document::new(4, "page", "Old");
        doc.status = "trash".into();
        let host = HostContext::in_memory(MemoryStore::new().with_document(doc));
        assert!(existing_document(&host, &Target::Document(4)).is_err());
    }

    #[test]
    fn options_surface_reads_only_exposed_names() {
        let host = HostContext::in_memory(
            MemoryStore::new()
                .with_option("blogname", json!("Site"))
                .with_option("admin_email", json!("root@example.com")),
        );
        let surface = OptionsSurface {
            exposed: vec!["blogname".into(), "blogdescription".into()],
        };
        let blob = surface.load(&host, &()).unwrap().unwrap();
        assert_eq!(Value::Object(blob), json!({"blogname": "Site"}));
    }

    #[test]
    fn failed_option_write_restores_earlier_options() {
        let store = RefusingStore {
            inner: MemoryStore::new().with_option("blogname", json!("Community")),
            refused: "time_format",
        };
        let host = HostContext::new(
            Arc::new(store),
            Arc::new(NoopCache),
            Arc::new(StaticWidgetCatalog::default()),
        );
        let surface = OptionsSurface {
            exposed: vec!["blogname".into(), "date_format".into(), "time_format".into()],
        };
        let payload = json!({
            "blogname": "Neighbours",
            "date_format": "Y-m-d",
            "time_format": "H:i",
        });

        let err = host
            .settings
            .merge_and_save(&host, &surface, &Target::Site, &payload, &AllowList::of(surface.exposed.clone()))
            .unwrap_err();

        assert!(matches!(err, SettingsError::Storage(_)));
        assert_eq!(host.store.get_option("blogname").unwrap(), Some(json!("Community")));
        assert_eq!(host.store.get_option("date_format").unwrap(), None);
        assert_eq!(host.store.get_option("time_format").unwrap(), None);
    }
}
