// ctech-common/src/host.rs
//! Services the bridge consumes from its host: key-value persistence,
//! derived-cache flushing, the page builder's widget registry and
//! authorization. None of these are implemented here beyond in-memory
//! versions used for tests and embedding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::error::{CacheError, StoreError};
use crate::settings::SettingsEngine;

/// Option holding the list of active host plugins.
pub const ACTIVE_PLUGINS_OPTION: &str = "active_plugins";

/// A content document (post, page, design kit) known to the host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: u64,
    #[serde(default = "default_post_type")]
    pub post_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_post_type() -> String {
    "page".to_string()
}

fn default_status() -> String {
    "publish".to_string()
}

impl Document {
    pub fn new(id: u64, post_type: &str, title: &str) -> Self {
        Document {
            id,
            post_type: post_type.to_string(),
            title: title.to_string(),
            status: default_status(),
        }
    }
}

/// Host key-value persistence, scoped globally (options) and per document (meta).
pub trait KeyValueStore: Send + Sync {
    fn get_option(&self, name: &str) -> Result<Option<Value>, StoreError>;
    fn set_option(&self, name: &str, value: Value) -> Result<(), StoreError>;
    fn delete_option(&self, name: &str) -> Result<bool, StoreError>;

    fn get_meta(&self, document: u64, key: &str) -> Result<Option<Value>, StoreError>;
    fn set_meta(&self, document: u64, key: &str, value: Value) -> Result<(), StoreError>;
    fn delete_meta(&self, document: u64, key: &str) -> Result<bool, StoreError>;

    fn document(&self, id: u64) -> Result<Option<Document>, StoreError>;
    fn documents(&self) -> Result<Vec<Document>, StoreError>;
}

/// Flushes derived artifacts (rendered CSS) after a settings write.
pub trait CacheInvalidator: Send + Sync {
    fn flush_document(&self, document: u64) -> Result<(), CacheError>;
    fn flush_all(&self) -> Result<(), CacheError>;
}

/// The page builder's widget registry: widget name -> widget definition.
pub trait WidgetCatalog: Send + Sync {
    fn widgets(&self) -> Result<Map<String, Value>, StoreError>;
}

/// Authorization tiers used by every route.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read tier: may edit content.
    EditPosts,
    /// Write tier: may administer the site.
    ManageOptions,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EditPosts => "edit_posts",
            Self::ManageOptions => "manage_options",
        }
    }
}

/// The authenticated caller of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub capabilities: BTreeSet<Capability>,
}

impl Actor {
    pub fn new(name: &str, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Actor {
            name: name.to_string(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Everything a unit may touch on the host, passed explicitly.
#[derive(Clone)]
pub struct HostContext {
    pub store: Arc<dyn KeyValueStore>,
    pub cache: Arc<dyn CacheInvalidator>,
    pub widgets: Arc<dyn WidgetCatalog>,
    pub settings: SettingsEngine,
}

impl HostContext {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        cache: Arc<dyn CacheInvalidator>,
        widgets: Arc<dyn WidgetCatalog>,
    ) -> Self {
        HostContext {
            store,
            cache,
            widgets,
            settings: SettingsEngine::new(),
        }
    }

    /// Host context backed by an in-memory store with no cache and no widgets.
    pub fn in_memory(store: MemoryStore) -> Self {
        Self::new(
            Arc::new(store),
            Arc::new(NoopCache),
            Arc::new(StaticWidgetCatalog::default()),
        )
    }

    /// Whether `plugin_file` (e.g. `elementor/elementor.php`) is listed in the
    /// `active_plugins` option. Read-only; store failures count as inactive.
    pub fn is_plugin_active(&self, plugin_file: &str) -> bool {
        match self.store.get_option(ACTIVE_PLUGINS_OPTION) {
            Ok(Some(Value::Array(plugins))) => plugins
                .iter()
                .any(|p| p.as_str() == Some(plugin_file)),
            Ok(_) => false,
            Err(e) => {
                debug!("Could not read {}: {}", ACTIVE_PLUGINS_OPTION, e);
                false
            }
        }
    }
}

/// Serializable snapshot of a host store.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StoreData {
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
    #[serde(default)]
    pub meta: BTreeMap<u64, BTreeMap<String, Value>>,
    #[serde(default)]
    pub documents: BTreeMap<u64, Document>,
}

impl StoreData {
    pub fn get_meta(&self, document: u64, key: &str) -> Option<Value> {
        self.meta.get(&document).and_then(|m| m.get(key)).cloned()
    }

    pub fn set_meta(&mut self, document: u64, key: &str, value: Value) {
        self.meta
            .entry(document)
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn delete_meta(&mut self, document: u64, key: &str) -> bool {
        let Some(entries) = self.meta.get_mut(&document) else {
            return false;
        };
        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            self.meta.remove(&document);
        }
        removed
    }
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: StoreData) -> Self {
        MemoryStore { data: RwLock::new(data) }
    }

    pub fn with_option(self, name: &str, value: Value) -> Self {
        self.write().options.insert(name.to_string(), value);
        self
    }

    pub fn with_document(self, document: Document) -> Self {
        self.write().documents.insert(document.id, document);
        self
    }

    pub fn with_meta(self, document: u64, key: &str, value: Value) -> Self {
        self.write().set_meta(document, key, value);
        self
    }

    pub fn snapshot(&self) -> StoreData {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_option(&self, name: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read().options.get(name).cloned())
    }

    fn set_option(&self, name: &str, value: Value) -> Result<(), StoreError> {
        self.write().options.insert(name.to_string(), value);
        Ok(())
    }

    fn delete_option(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.write().options.remove(name).is_some())
    }

    fn get_meta(&self, document: u64, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read().get_meta(document, key))
    }

    fn set_meta(&self, document: u64, key: &str, value: Value) -> Result<(), StoreError> {
        self.write().set_meta(document, key, value);
        Ok(())
    }

    fn delete_meta(&self, document: u64, key: &str) -> Result<bool, StoreError> {
        Ok(self.write().delete_meta(document, key))
    }

    fn document(&self, id: u64) -> Result<Option<Document>, StoreError> {
        Ok(self.read().documents.get(&id).cloned())
    }

    fn documents(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.read().documents.values().cloned().collect())
    }
}

/// Cache that has nothing to flush.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl CacheInvalidator for NoopCache {
    fn flush_document(&self, _document: u64) -> Result<(), CacheError> {
        Ok(())
    }

    fn flush_all(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Widget catalog held in memory.
#[derive(Debug, Default, Clone)]
pub struct StaticWidgetCatalog {
    widgets: Map<String, Value>,
}

impl StaticWidgetCatalog {
    pub fn new(widgets: Map<String, Value>) -> Self {
        StaticWidgetCatalog { widgets }
    }
}

impl WidgetCatalog for StaticWidgetCatalog {
    fn widgets(&self) -> Result<Map<String, Value>, StoreError> {
        Ok(self.widgets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plugin_activity_reads_active_plugins_option() {
        let host = HostContext::in_memory(
            MemoryStore::new().with_option(ACTIVE_PLUGINS_OPTION, json!(["elementor/elementor.php"])),
        );
        assert!(host.is_plugin_active("elementor/elementor.php"));
        assert!(!host.is_plugin_active("wordpress-seo/wp-seo.php"));
    }

    #[test]
    fn malformed_active_plugins_counts_as_inactive() {
        let host = HostContext::in_memory(
            MemoryStore::new().with_option(ACTIVE_PLUGINS_OPTION, json!("elementor/elementor.php")),
        );
        assert!(!host.is_plugin_active("elementor/elementor.php"));
    }

    #[test]
    fn deleting_last_meta_key_drops_document_entry() {
        let store = MemoryStore::new().with_meta(7, "_elementor_css", json!({"status": "file"}));
        assert!(store.delete_meta(7, "_elementor_css").unwrap());
        assert!(!store.delete_meta(7, "_elementor_css").unwrap());
        assert!(store.snapshot().meta.is_empty());
    }

    #[test]
    fn actor_capabilities_are_explicit() {
        let editor = Actor::new("editor", [Capability::EditPosts]);
        assert!(editor.can(Capability::EditPosts));
        assert!(!editor.can(Capability::ManageOptions));
    }
}
