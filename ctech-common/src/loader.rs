// ctech-common/src/loader.rs
//! Directory-driven unit discovery.
//!
//! Each immediate subdirectory of the units root is a candidate. A directory
//! becomes an active unit when it carries an entry file, its name maps to a
//! type registered in the [`UnitCatalog`], the built unit honours the naming
//! contract, and the unit reports itself available.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::UnitError;
use crate::host::HostContext;
use crate::unit::{validate_slug, Unit, UnitFactory};

/// File that marks a directory as a unit.
pub const ENTRY_FILE: &str = "unit.json";

/// Namespace prefix of unit type names.
pub const DEFAULT_TYPE_PREFIX: &str = "CT";

/// `elementor-kit` -> `CT_Elementor_Kit`.
pub fn type_name_for(prefix: &str, name: &str) -> String {
    let segments: Vec<String> = name
        .split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    format!("{}_{}", prefix, segments.join("_"))
}

/// Explicit table from type name to factory.
#[derive(Debug, Clone)]
pub struct UnitCatalog {
    prefix: String,
    factories: BTreeMap<String, UnitFactory>,
}

impl Default for UnitCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_TYPE_PREFIX)
    }
}

impl UnitCatalog {
    pub fn new(prefix: &str) -> Self {
        UnitCatalog {
            prefix: prefix.to_string(),
            factories: BTreeMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register a factory under the type name derived from `slug`.
    pub fn register(mut self, slug: &str, factory: UnitFactory) -> Self {
        let type_name = type_name_for(&self.prefix, slug);
        self.factories.insert(type_name, factory);
        self
    }

    pub fn factory(&self, type_name: &str) -> Option<UnitFactory> {
        self.factories.get(type_name).copied()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// Why a directory did not become an active unit.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    NoEntryFile,
    InvalidEntryFile(String),
    Disabled,
    UnknownType(String),
    ContractViolation(String),
    Unavailable,
    DuplicateSlug(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoEntryFile => write!(f, "no {} entry file", ENTRY_FILE),
            SkipReason::InvalidEntryFile(e) => write!(f, "invalid entry file: {}", e),
            SkipReason::Disabled => write!(f, "disabled in entry file"),
            SkipReason::UnknownType(t) => write!(f, "type {} is not registered", t),
            SkipReason::ContractViolation(e) => write!(f, "contract violation: {}", e),
            SkipReason::Unavailable => write!(f, "dependencies unavailable"),
            SkipReason::DuplicateSlug(s) => write!(f, "slug '{}' is already loaded", s),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SkippedUnit {
    pub directory: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to list units directory {path}: {source}")]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unit '{slug}' failed to initialize: {source}")]
    Init {
        slug: String,
        #[source]
        source: UnitError,
    },
}

/// Result of one load pass.
#[derive(Default, Clone)]
pub struct LoadReport {
    pub units: BTreeMap<String, Arc<dyn Unit>>,
    pub skipped: Vec<SkippedUnit>,
}

impl fmt::Debug for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadReport")
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .field("skipped", &self.skipped)
            .finish()
    }
}

/// Scans a root directory and activates units found there.
#[derive(Debug, Clone)]
pub struct UnitLoader {
    root: PathBuf,
    catalog: UnitCatalog,
}

impl UnitLoader {
    pub fn new(root: impl Into<PathBuf>, catalog: UnitCatalog) -> Self {
        UnitLoader {
            root: root.into(),
            catalog,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Discover, validate and activate units. A missing root yields an empty
    /// report; per-directory problems are skips; an `init` failure aborts.
    pub fn load(&self, host: &HostContext) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::default();

        if !self.root.is_dir() {
            info!("Units directory {} does not exist; no units loaded", self.root.display());
            return Ok(report);
        }

        for dir in self.candidate_dirs()? {
            let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                debug!("Skipping non UTF-8 directory {}", dir.display());
                continue;
            };

            match self.activate(host, &dir, &dir_name, &report)? {
                Ok(unit) => {
                    info!("Loaded unit '{}' ({})", unit.slug(), unit.name());
                    report.units.insert(unit.slug().to_string(), unit);
                }
                Err(reason) => report.skipped.push(SkippedUnit {
                    directory: dir_name,
                    reason,
                }),
            }
        }

        info!(
            "Unit discovery finished: {} loaded, {} skipped",
            report.units.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn candidate_dirs(&self) -> Result<Vec<PathBuf>, LoadError> {
        let read_root = |source: std::io::Error| LoadError::ReadRoot {
            path: self.root.clone(),
            source,
        };

        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(read_root)? {
            let path = entry.map_err(read_root)?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Outer `Err` aborts the pass; inner `Err` skips this directory.
    fn activate(
        &self,
        host: &HostContext,
        dir: &Path,
        dir_name: &str,
        report: &LoadReport,
    ) -> Result<Result<Arc<dyn Unit>, SkipReason>, LoadError> {
        let entry = dir.join(ENTRY_FILE);
        if !entry.is_file() {
            debug!("{} has no {}; not a unit", dir.display(), ENTRY_FILE);
            return Ok(Err(SkipReason::NoEntryFile));
        }

        match read_entry_file(&entry) {
            Ok(manifest) => {
                if manifest.get("enabled").and_then(Value::as_bool) == Some(false) {
                    info!("Unit directory '{}' is disabled", dir_name);
                    return Ok(Err(SkipReason::Disabled));
                }
            }
            Err(e) => {
                warn!("Skipping '{}': {}", dir_name, e);
                return Ok(Err(SkipReason::InvalidEntryFile(e)));
            }
        }

        let type_name = type_name_for(self.catalog.prefix(), dir_name);
        let Some(factory) = self.catalog.factory(&type_name) else {
            warn!("Skipping '{}': type {} is not registered", dir_name, type_name);
            return Ok(Err(SkipReason::UnknownType(type_name)));
        };

        let unit = factory();
        if let Err(violation) = check_contract(unit.as_ref(), self.catalog.prefix(), &type_name) {
            warn!("Skipping '{}': {}", dir_name, violation);
            return Ok(Err(SkipReason::ContractViolation(violation)));
        }

        let slug = unit.slug().to_string();
        if report.units.contains_key(&slug) {
            warn!("Skipping '{}': slug '{}' is already loaded", dir_name, slug);
            return Ok(Err(SkipReason::DuplicateSlug(slug)));
        }

        if !unit.is_available(host) {
            info!("Unit '{}' is unavailable (dependency inactive); skipping", slug);
            return Ok(Err(SkipReason::Unavailable));
        }

        unit.init(host).map_err(|source| LoadError::Init {
            slug: slug.clone(),
            source,
        })?;
        Ok(Ok(unit))
    }
}

fn read_entry_file(path: &Path) -> Result<serde_json::Map<String, Value>, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!("{} must contain a JSON object", path.display())),
        Err(e) => Err(format!("{} is not valid JSON: {}", path.display(), e)),
    }
}

fn check_contract(unit: &dyn Unit, prefix: &str, expected_type: &str) -> Result<(), String> {
    let slug = unit.slug();
    if !validate_slug(slug) {
        return Err(format!("slug '{}' is not lowercase kebab-case", slug));
    }
    if unit.name().trim().is_empty() {
        return Err(format!("unit '{}' has an empty name", slug));
    }
    let derived = type_name_for(prefix, slug);
    if derived != expected_type {
        return Err(format!(
            "slug '{}' maps to {} but the directory maps to {}",
            slug, derived, expected_type
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_type_names() {
        assert_eq!(type_name_for("CT", "elementor-kit"), "CT_Elementor_Kit");
        assert_eq!(type_name_for("CT", "seo-meta"), "CT_Seo_Meta");
        assert_eq!(type_name_for("CT", "options"), "CT_Options");
        assert_eq!(type_name_for("CT", "Elementor-kit"), "CT_Elementor_Kit");
    }

    #[test]
    fn skip_reasons_render() {
        assert_eq!(SkipReason::NoEntryFile.to_string(), "no unit.json entry file");
        assert_eq!(
            SkipReason::DuplicateSlug("seo-meta".into()).to_string(),
            "slug 'seo-meta' is already loaded"
        );
    }
}
