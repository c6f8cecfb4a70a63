// ctech-common/src/settings.rs
//! Partial updates of structured settings blobs.
//!
//! Every settings-bearing unit goes through [`SettingsEngine`]: resolve the
//! target, read the current blob (absent means empty), keep only allow-listed
//! payload keys, shallow-merge, persist, then flush derived caches on a
//! best-effort basis.

use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{CacheError, StoreError};
use crate::host::HostContext;

/// One external settings surface: string keys to arbitrary JSON values.
pub type SettingsBlob = Map<String, Value>;

#[derive(Debug, Error)]
pub enum SettingsError {
    /// The target cannot be resolved at all (e.g. no active design kit).
    #[error("{message}")]
    NoActiveTarget { code: Cow<'static, str>, message: String },
    /// The target resolved to something that does not exist (e.g. unknown post).
    #[error("{message}")]
    TargetNotFound { code: Cow<'static, str>, message: String },
    #[error("invalid settings payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// What a settings operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The currently active configuration root (e.g. the active design kit).
    Active,
    /// A single document by id.
    Document(u64),
    /// Site-wide options.
    Site,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Active => write!(f, "active"),
            Target::Document(id) => write!(f, "document:{}", id),
            Target::Site => write!(f, "site"),
        }
    }
}

/// Keys a write may touch. Empty means no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    keys: BTreeSet<String>,
}

impl AllowList {
    /// Unrestricted allow-list.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn permits(&self, key: &str) -> bool {
        self.is_unrestricted() || self.keys.contains(key)
    }

    /// Payload entries this list permits; the rest are dropped without notice.
    pub fn filter(&self, payload: &SettingsBlob) -> SettingsBlob {
        payload
            .iter()
            .filter(|(key, _)| self.permits(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Storage binding for one kind of settings blob.
pub trait SettingsSurface {
    type Location;

    fn resolve(&self, host: &HostContext, target: &Target) -> Result<Self::Location, SettingsError>;

    /// `Ok(None)` when nothing is stored yet at `location`.
    fn load(&self, host: &HostContext, location: &Self::Location)
        -> Result<Option<SettingsBlob>, SettingsError>;

    fn persist(
        &self,
        host: &HostContext,
        location: &Self::Location,
        blob: &SettingsBlob,
    ) -> Result<(), SettingsError>;

    /// Flush derived artifacts for `location`. Failures are logged, never propagated.
    fn invalidate(&self, host: &HostContext, location: &Self::Location) -> Result<(), CacheError> {
        let _ = (host, location);
        Ok(())
    }

    /// Identifier reported back to callers (kit id, post id, ...).
    fn target_id(&self, location: &Self::Location) -> Value;

    /// Key used to serialize concurrent writes to the same location.
    fn lock_key(&self, location: &Self::Location) -> String;
}

/// Current state of a surface.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub target: Value,
    /// `None` when nothing has been stored yet.
    pub settings: Option<SettingsBlob>,
}

/// Outcome of a successful merge-and-save.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UpdateResult {
    pub target: Value,
    pub updated_fields: Vec<String>,
    pub settings: SettingsBlob,
}

/// Entries of `blob` whose key is in `keys`. Missing keys are omitted, not padded.
pub fn extract_subset<S: AsRef<str>>(blob: &SettingsBlob, keys: &[S]) -> SettingsBlob {
    keys.iter()
        .filter_map(|key| {
            let key = key.as_ref();
            blob.get(key).map(|value| (key.to_string(), value.clone()))
        })
        .collect()
}

/// Shallow merge: every update key overwrites or inserts; nested values are
/// replaced wholesale; other keys are untouched.
pub fn merge(current: &mut SettingsBlob, updates: SettingsBlob) {
    for (key, value) in updates {
        current.insert(key, value);
    }
}

/// One mutex per lock key, held only while some write uses it.
#[derive(Debug, Default)]
struct TargetLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Drop the entry for `key` once the table holds the only reference.
    fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }
}

/// Read and merge-and-save over any [`SettingsSurface`]. Writes to the same
/// location are serialized; writes to different locations run independently.
#[derive(Debug, Clone, Default)]
pub struct SettingsEngine {
    locks: Arc<TargetLocks>,
}

impl SettingsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<S: SettingsSurface>(
        &self,
        host: &HostContext,
        surface: &S,
        target: &Target,
    ) -> Result<Snapshot, SettingsError> {
        let location = surface.resolve(host, target)?;
        let settings = surface.load(host, &location)?;
        Ok(Snapshot {
            target: surface.target_id(&location),
            settings,
        })
    }

    pub fn merge_and_save<S: SettingsSurface>(
        &self,
        host: &HostContext,
        surface: &S,
        target: &Target,
        payload: &Value,
        allow: &AllowList,
    ) -> Result<UpdateResult, SettingsError> {
        let payload = payload.as_object().ok_or_else(|| {
            SettingsError::InvalidPayload("settings payload must be a JSON object".to_string())
        })?;

        let location = surface.resolve(host, target)?;
        let key = surface.lock_key(&location);
        let lock = self.locks.lock_for(&key);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            save_locked(host, surface, target, &location, payload, allow)
        };
        self.locks.release(&key, lock);
        result
    }
}

fn save_locked<S: SettingsSurface>(
    host: &HostContext,
    surface: &S,
    target: &Target,
    location: &S::Location,
    payload: &SettingsBlob,
    allow: &AllowList,
) -> Result<UpdateResult, SettingsError> {
    let mut current = surface.load(host, location)?.unwrap_or_default();
    let accepted = allow.filter(payload);
    let updated_fields: Vec<String> = accepted.keys().cloned().collect();

    if accepted.is_empty() {
        debug!("No permitted keys in payload for {}; nothing written", target);
        return Ok(UpdateResult {
            target: surface.target_id(location),
            updated_fields,
            settings: current,
        });
    }

    merge(&mut current, accepted);
    surface.persist(host, location, &current)?;
    info!("Updated {} setting(s) on {}: {}", updated_fields.len(), target, updated_fields.join(", "));

    if let Err(e) = surface.invalidate(host, location) {
        warn!("Cache invalidation failed for {} (write kept): {}", target, e);
    }

    Ok(UpdateResult {
        target: surface.target_id(location),
        updated_fields,
        settings: current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Document, MemoryStore};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    const META_KEY: &str = "_test_settings";

    #[derive(Default)]
    struct MetaSurface {
        loads: AtomicUsize,
        flushes: AtomicUsize,
        failing_cache: bool,
        /// Widens the gap between reading and persisting a blob.
        load_delay: Option<Duration>,
    }

    impl SettingsSurface for MetaSurface {
        type Location = u64;

        fn resolve(&self, host: &HostContext, target: &Target) -> Result<u64, SettingsError> {
            match target {
                Target::Document(id) => match host.store.document(*id)? {
                    Some(_) => Ok(*id),
                    None => Err(SettingsError::TargetNotFound {
                        code: "rest_post_invalid_id".into(),
                        message: "Invalid post ID.".into(),
                    }),
                },
                _ => Err(SettingsError::NoActiveTarget {
                    code: "no_target".into(),
                    message: "no target".into(),
                }),
            }
        }

        fn load(&self, host: &HostContext, id: &u64) -> Result<Option<SettingsBlob>, SettingsError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.load_delay {
                thread::sleep(delay);
            }
            Ok(host
                .store
                .get_meta(*id, META_KEY)?
                .and_then(|v| v.as_object().cloned()))
        }

        fn persist(&self, host: &HostContext, id: &u64, blob: &SettingsBlob) -> Result<(), SettingsError> {
            host.store.set_meta(*id, META_KEY, Value::Object(blob.clone()))?;
            Ok(())
        }

        fn invalidate(&self, _host: &HostContext, _id: &u64) -> Result<(), CacheError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            if self.failing_cache {
                Err(CacheError("css directory is read-only".into()))
            } else {
                Ok(())
            }
        }

        fn target_id(&self, id: &u64) -> Value {
            json!(id)
        }

        fn lock_key(&self, id: &u64) -> String {
            format!("test:{}", id)
        }
    }

    fn host_with(blob: Value) -> HostContext {
        HostContext::in_memory(
            MemoryStore::new()
                .with_document(Document::new(10, "page", "Home"))
                .with_meta(10, META_KEY, blob),
        )
    }

    fn stored(host: &HostContext) -> Value {
        host.store.get_meta(10, META_KEY).unwrap().unwrap()
    }

    #[test]
    fn merge_preserves_keys_absent_from_payload() {
        let host = host_with(json!({"a": 1, "b": 2}));
        let result = host
            .settings
            .merge_and_save(&host, &MetaSurface::default(), &Target::Document(10), &json!({"b": 5}), &AllowList::any())
            .unwrap();

        assert_eq!(stored(&host), json!({"a": 1, "b": 5}));
        assert_eq!(result.updated_fields, vec!["b"]);
        assert_eq!(result.target, json!(10));
    }

    #[test]
    fn merge_is_idempotent() {
        let host = host_with(json!({"a": 1}));
        let surface = MetaSurface::default();
        let payload = json!({"b": {"nested": [1, 2]}, "a": 3});

        host.settings
            .merge_and_save(&host, &surface, &Target::Document(10), &payload, &AllowList::any())
            .unwrap();
        let once = stored(&host);
        host.settings
            .merge_and_save(&host, &surface, &Target::Document(10), &payload, &AllowList::any())
            .unwrap();

        assert_eq!(stored(&host), once);
    }

    #[test]
    fn nested_values_are_replaced_not_deep_merged() {
        let host = host_with(json!({"colors": {"primary": "#fff", "accent": "#000"}}));
        host.settings
            .merge_and_save(
                &host,
                &MetaSurface::default(),
                &Target::Document(10),
                &json!({"colors": {"primary": "#111"}}),
                &AllowList::any(),
            )
            .unwrap();

        assert_eq!(stored(&host), json!({"colors": {"primary": "#111"}}));
    }

    #[test]
    fn allow_list_drops_unlisted_keys_silently() {
        let host = host_with(json!({}));
        let result = host
            .settings
            .merge_and_save(
                &host,
                &MetaSurface::default(),
                &Target::Document(10),
                &json!({"a": 1, "c": 9}),
                &AllowList::of(["a"]),
            )
            .unwrap();

        assert_eq!(result.updated_fields, vec!["a"]);
        assert_eq!(stored(&host), json!({"a": 1}));
    }

    #[test]
    fn missing_blob_starts_fresh() {
        let host = HostContext::in_memory(MemoryStore::new().with_document(Document::new(10, "page", "Home")));
        let result = host
            .settings
            .merge_and_save(&host, &MetaSurface::default(), &Target::Document(10), &json!({"x": true}), &AllowList::any())
            .unwrap();

        assert_eq!(result.settings, json!({"x": true}).as_object().cloned().unwrap());
    }

    #[test]
    fn unresolvable_target_is_an_error_not_a_fresh_start() {
        let host = host_with(json!({}));
        let err = host
            .settings
            .merge_and_save(&host, &MetaSurface::default(), &Target::Active, &json!({"x": 1}), &AllowList::any())
            .unwrap_err();
        assert!(matches!(err, SettingsError::NoActiveTarget { .. }));

        let err = host
            .settings
            .merge_and_save(&host, &MetaSurface::default(), &Target::Document(99), &json!({"x": 1}), &AllowList::any())
            .unwrap_err();
        assert!(matches!(err, SettingsError::TargetNotFound { .. }));
    }

    #[test]
    fn non_object_payload_is_rejected_before_reading() {
        let host = host_with(json!({"a": 1}));
        let surface = MetaSurface::default();
        let err = host
            .settings
            .merge_and_save(&host, &surface, &Target::Document(10), &json!(["a"]), &AllowList::any())
            .unwrap_err();

        assert!(matches!(err, SettingsError::InvalidPayload(_)));
        assert_eq!(surface.loads.load(Ordering::SeqCst), 0);
        assert_eq!(stored(&host), json!({"a": 1}));
    }

    #[test]
    fn cache_failure_does_not_fail_the_write() {
        let host = host_with(json!({}));
        let surface = MetaSurface {
            failing_cache: true,
            ..MetaSurface::default()
        };
        let result = host
            .settings
            .merge_and_save(&host, &surface, &Target::Document(10), &json!({"a": 1}), &AllowList::any())
            .unwrap();

        assert_eq!(result.updated_fields, vec!["a"]);
        assert_eq!(surface.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(stored(&host), json!({"a": 1}));
    }

    #[test]
    fn fully_filtered_payload_writes_nothing() {
        let host = host_with(json!({"a": 1}));
        let surface = MetaSurface::default();
        let result = host
            .settings
            .merge_and_save(&host, &surface, &Target::Document(10), &json!({"z": 1}), &AllowList::of(["a"]))
            .unwrap();

        assert!(result.updated_fields.is_empty());
        assert_eq!(surface.flushes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn read_reports_missing_blob_as_none() {
        let host = HostContext::in_memory(MemoryStore::new().with_document(Document::new(10, "page", "Home")));
        let snapshot = host
            .settings
            .read(&host, &MetaSurface::default(), &Target::Document(10))
            .unwrap();
        assert_eq!(snapshot.target, json!(10));
        assert!(snapshot.settings.is_none());
    }

    #[test]
    fn subset_extraction_does_not_pad() {
        let blob = json!({"a": 1, "z": 0}).as_object().cloned().unwrap();
        let subset = extract_subset(&blob, &["a", "b"]);
        assert_eq!(Value::Object(subset), json!({"a": 1}));
    }

    #[test]
    fn concurrent_writes_to_one_target_keep_both_keys() {
        let host = host_with(json!({}));
        let surface = MetaSurface {
            load_delay: Some(Duration::from_millis(50)),
            ..MetaSurface::default()
        };

        thread::scope(|scope| {
            for key in ["a", "b"] {
                let (host, surface) = (&host, &surface);
                scope.spawn(move || {
                    let mut payload = Map::new();
                    payload.insert(key.to_string(), json!(true));
                    host.settings
                        .merge_and_save(host, surface, &Target::Document(10), &Value::Object(payload), &AllowList::any())
                        .unwrap();
                });
            }
        });

        assert_eq!(stored(&host), json!({"a": true, "b": true}));
        assert_eq!(surface.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn lock_entries_are_released_after_writes() {
        let host = HostContext::in_memory(
            MemoryStore::new()
                .with_document(Document::new(10, "page", "Home"))
                .with_document(Document::new(11, "page", "About")),
        );
        for id in [10, 11] {
            host.settings
                .merge_and_save(&host, &MetaSurface::default(), &Target::Document(id), &json!({"a": 1}), &AllowList::any())
                .unwrap();
        }
        assert!(host.settings.locks.locks.lock().unwrap().is_empty());
    }
}
