/// Workbench configuration loaded from `config.yaml`
///
/// Every field has a default so a missing file, or a file that only sets
/// a few keys, still yields a usable configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{Result, WorkbenchError};
use crate::state::data::EngineVersion;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "GHOST_WORKBENCH_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub generation: GenerationConfig,
    pub catalog: CatalogConfig,
    pub images: ImageConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of generated images; metadata logs live in `<base_path>/logs`
    pub base_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./output"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Engine tag forwarded with each request
    pub engine: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/api/generate".to_string(),
            timeout_secs: 600,
            engine: EngineVersion::V1.tag().to_string(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Overrides the database location in the user data directory
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Catalog CSV imported into the database at startup
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageConfig {
    /// Edge length for grid thumbnails
    pub thumbnail_size: u32,
    /// Edge length requested for the comparison viewer
    pub full_size: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 256,
            full_size: 1024,
        }
    }
}

impl Config {
    /// Load from `$GHOST_WORKBENCH_CONFIG`, falling back to `./config.yaml`
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| WorkbenchError::io(path, e))?;
        let config = Self::from_yaml(&contents).map_err(|source| WorkbenchError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }
}
