// ctech-server/src/widget_catalog.rs
use ctech_common::{StoreError, WidgetCatalog};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Widget registry exported by the page builder as a JSON object keyed by
/// widget name. Re-read on every call so a fresh export is picked up.
pub struct JsonWidgetCatalog {
    path: PathBuf,
}

impl JsonWidgetCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonWidgetCatalog { path: path.into() }
    }
}

impl WidgetCatalog for JsonWidgetCatalog {
    fn widgets(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            info!("Widget catalog {} does not exist; no widgets", self.path.display());
            return Ok(Map::new());
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|e| StoreError(format!("cannot read {}: {}", self.path.display(), e)))?;
        match serde_json::from_str(&raw) {
            Ok(Value::Object(widgets)) => Ok(widgets),
            Ok(_) => Err(StoreError(format!(
                "widget catalog {} must contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StoreError(format!(
                "invalid widget catalog {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_catalog_object() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("widgets.json");
        fs::write(&path, r#"{ "heading": { "title": "Heading", "categories": ["basic"] } }"#).unwrap();

        let widgets = JsonWidgetCatalog::new(&path).widgets().unwrap();
        assert_eq!(widgets["heading"]["title"], "Heading");
    }

    #[test]
    fn missing_catalog_is_empty() {
        let temp = TempDir::new().unwrap();
        let widgets = JsonWidgetCatalog::new(temp.path().join("widgets.json")).widgets().unwrap();
        assert!(widgets.is_empty());
    }

    #[test]
    fn non_object_catalog_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("widgets.json");
        fs::write(&path, "[]").unwrap();
        assert!(JsonWidgetCatalog::new(&path).widgets().is_err());
    }
}
