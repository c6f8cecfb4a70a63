// ctech-server/src/store.rs
use ctech_common::{Document, KeyValueStore, StoreData, StoreError};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Host store kept as one JSON document on disk. Every mutation is written
/// to a temporary file and renamed over the original.
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            info!("Loading site store from file: {}", path.display());
            let raw = fs::read_to_string(&path)
                .map_err(|e| StoreError(format!("cannot read {}: {}", path.display(), e)))?;
            serde_json::from_str(&raw)
                .map_err(|e| StoreError(format!("invalid store file {}: {}", path.display(), e)))?
        } else {
            info!("Site store {} does not exist yet; starting empty", path.display());
            StoreData::default()
        };

        Ok(JsonFileStore {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> T {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        f(&data)
    }

    /// Apply `f` to a copy, write it out, then publish it. A failed write
    /// leaves the in-memory state unchanged.
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreData) -> T) -> Result<T, StoreError> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = data.clone();
        let result = f(&mut next);
        self.save(&next)?;
        *data = next;
        Ok(result)
    }

    fn save(&self, data: &StoreData) -> Result<(), StoreError> {
        let io_err = |e: std::io::Error| StoreError(format!("cannot write {}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let raw = serde_json::to_string_pretty(data).map_err(|e| StoreError(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!("Saved site store to {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_option(&self, name: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read(|d| d.options.get(name).cloned()))
    }

    fn set_option(&self, name: &str, value: Value) -> Result<(), StoreError> {
        self.mutate(|d| {
            d.options.insert(name.to_string(), value);
        })
    }

    fn delete_option(&self, name: &str) -> Result<bool, StoreError> {
        if self.read(|d| !d.options.contains_key(name)) {
            return Ok(false);
        }
        self.mutate(|d| d.options.remove(name).is_some())
    }

    fn get_meta(&self, document: u64, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read(|d| d.get_meta(document, key)))
    }

    fn set_meta(&self, document: u64, key: &str, value: Value) -> Result<(), StoreError> {
        self.mutate(|d| d.set_meta(document, key, value))
    }

    fn delete_meta(&self, document: u64, key: &str) -> Result<bool, StoreError> {
        if self.read(|d| d.get_meta(document, key).is_none()) {
            return Ok(false);
        }
        self.mutate(|d| d.delete_meta(document, key))
    }

    fn document(&self, id: u64) -> Result<Option<Document>, StoreError> {
        Ok(self.read(|d| d.documents.get(&id).cloned()))
    }

    fn documents(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.read(|d| d.documents.values().cloned().collect()))
    }
}
