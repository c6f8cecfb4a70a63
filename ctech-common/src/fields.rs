// ctech-common/src/fields.rs
//! Friendly-name tables and the `"yes"` / `""` switch encoding.
//!
//! Which fields use the switch encoding is declared per field, never guessed
//! from a value's type.

use serde_json::Value;

use crate::settings::{AllowList, SettingsBlob};

/// Stored value of an enabled switch.
pub const FLAG_ON: &str = "yes";
/// Stored value of a disabled switch.
pub const FLAG_OFF: &str = "";

/// Whether a caller-supplied value means "on".
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "true" | "1" | "on"
        ),
        _ => false,
    }
}

pub fn encode_flag(value: &Value) -> Value {
    Value::String(if is_truthy(value) { FLAG_ON } else { FLAG_OFF }.to_string())
}

/// Stored switch value to a boolean: only the sentinel reads as `true`.
pub fn decode_flag(value: &Value) -> bool {
    match value {
        Value::String(s) => s == FLAG_ON,
        Value::Bool(b) => *b,
        _ => false,
    }
}

/// Decode the listed switch keys of a stored blob in place.
pub fn decode_flags(blob: &mut SettingsBlob, flags: &[&str]) {
    for key in flags {
        if let Some(value) = blob.get_mut(*key) {
            *value = Value::Bool(decode_flag(value));
        }
    }
}

/// Encode the listed switch keys of an incoming payload in place.
pub fn encode_flags(payload: &mut SettingsBlob, flags: &[&str]) {
    for key in flags {
        if let Some(value) = payload.get_mut(*key) {
            *value = encode_flag(value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
}

/// One wire field and the storage key it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub friendly: &'static str,
    pub storage: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn text(friendly: &'static str, storage: &'static str) -> Self {
        FieldSpec { friendly, storage, kind: FieldKind::Text }
    }

    pub const fn flag(friendly: &'static str, storage: &'static str) -> Self {
        FieldSpec { friendly, storage, kind: FieldKind::Flag }
    }
}

/// Fixed 1:1 table between request/response names and storage keys.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    fields: &'static [FieldSpec],
}

impl FieldMap {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        FieldMap { fields }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn by_friendly(&self, friendly: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.friendly == friendly)
    }

    pub fn friendly_name(&self, storage: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.storage == storage)
            .map(|f| f.friendly)
    }

    pub fn storage_keys(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.storage).collect()
    }

    /// Writes through this table may touch only its storage keys.
    pub fn storage_allow_list(&self) -> AllowList {
        AllowList::of(self.storage_keys())
    }

    /// Translate a friendly payload to storage keys. Unknown names are dropped.
    pub fn to_storage(&self, payload: &SettingsBlob) -> SettingsBlob {
        payload
            .iter()
            .filter_map(|(name, value)| {
                let spec = self.by_friendly(name)?;
                let value = match spec.kind {
                    FieldKind::Text => value.clone(),
                    FieldKind::Flag => encode_flag(value),
                };
                Some((spec.storage.to_string(), value))
            })
            .collect()
    }

    /// Translate a stored blob to friendly names. Unmapped keys are omitted.
    pub fn to_friendly(&self, blob: &SettingsBlob) -> SettingsBlob {
        self.fields
            .iter()
            .filter_map(|spec| {
                let value = blob.get(spec.storage)?;
                let value = match spec.kind {
                    FieldKind::Text => value.clone(),
                    FieldKind::Flag => Value::Bool(decode_flag(value)),
                };
                Some((spec.friendly.to_string(), value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SPECS: &[FieldSpec] = &[
        FieldSpec::text("title", "seo_title"),
        FieldSpec::flag("noindex", "robots_noindex"),
    ];
    const FIELDS: FieldMap = FieldMap::new(SPECS);

    fn blob(v: Value) -> SettingsBlob {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn truthy_inputs() {
        for v in [json!(true), json!(1), json!("yes"), json!("On"), json!("TRUE"), json!(" 1 ")] {
            assert!(is_truthy(&v), "{v} should be truthy");
        }
        for v in [json!(false), json!(0), json!(""), json!("no"), json!(null), json!([1])] {
            assert!(!is_truthy(&v), "{v} should be falsy");
        }
    }

    #[test]
    fn flags_use_sentinel_storage() {
        let stored = FIELDS.to_storage(&blob(json!({"noindex": true, "title": "Hi"})));
        assert_eq!(Value::Object(stored.clone()), json!({"robots_noindex": "yes", "seo_title": "Hi"}));
        assert_eq!(Value::Object(FIELDS.to_friendly(&stored)), json!({"noindex": true, "title": "Hi"}));

        let stored = FIELDS.to_storage(&blob(json!({"noindex": false})));
        assert_eq!(Value::Object(stored.clone()), json!({"robots_noindex": ""}));
        assert_eq!(Value::Object(FIELDS.to_friendly(&stored)), json!({"noindex": false}));
    }

    #[test]
    fn unknown_friendly_names_are_dropped() {
        let stored = FIELDS.to_storage(&blob(json!({"title": "x", "robots_noindex": "yes"})));
        assert_eq!(Value::Object(stored), json!({"seo_title": "x"}));
    }

    #[test]
    fn flag_encoding_is_declared_not_inferred() {
        let mut payload = blob(json!({"hide_title": true, "other": true}));
        encode_flags(&mut payload, &["hide_title"]);
        assert_eq!(Value::Object(payload.clone()), json!({"hide_title": "yes", "other": true}));

        decode_flags(&mut payload, &["hide_title"]);
        assert_eq!(Value::Object(payload), json!({"hide_title": true, "other": true}));
    }
}
