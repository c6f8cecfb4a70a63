// ctech-server/src/config.rs
use ctech_common::Capability;
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE_PATH: &str = "data/server/config.json";
/// Environment variable overriding [`CONFIG_FILE_PATH`].
pub const CONFIG_ENV: &str = "CTECH_CONFIG";

const SERVER_PORT: u16 = 3001;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub units_dir: PathBuf,
    pub store_path: PathBuf,
    pub css_cache_dir: PathBuf,
    pub widget_catalog_path: PathBuf,
    pub actors: Vec<ActorConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: SERVER_PORT,
            units_dir: PathBuf::from("data/units"),
            store_path: PathBuf::from("data/site/store.json"),
            css_cache_dir: PathBuf::from("data/uploads/elementor/css"),
            widget_catalog_path: PathBuf::from("data/elementor/widgets.json"),
            actors: Vec::new(),
        }
    }
}

/// A caller allowed to use the API, authenticated by its token.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ActorConfig {
    pub name: String,
    pub token: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl ServerConfig {
    /// Load from `$CTECH_CONFIG` or the default path. A missing file yields defaults.
    pub fn load() -> Result<Self, Box<dyn Error + Send + Sync>> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_FILE_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self, Box<dyn Error + Send + Sync>> {
        if !path.exists() {
            info!("Config file {} not found; using defaults", path.display());
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let config: ServerConfig = serde_json::from_str(&data)
            .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
