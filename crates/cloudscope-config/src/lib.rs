pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";

/// Find the project's config.json
///
/// Search order:
/// 1. Environment variable CLOUDSCOPE_CONFIG (direct path)
/// 2. Current directory: config.json
/// 3. ./.cloudscope/config.json
/// 4. ~/.config/cloudscope/config.json (global config)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("CLOUDSCOPE_CONFIG") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    let path = current_dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(path);
    }

    let path = current_dir.join(".cloudscope").join(CONFIG_FILE);
    if path.exists() {
        return Ok(path);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("cloudscope").join(CONFIG_FILE);
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Worker pool sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerLimits {
    /// Providers discovered at the same time
    pub clouds: usize,
    pub aws: usize,
    pub azure: usize,
    pub gcp: usize,
    /// Concurrent per-item operations
    pub operations: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            clouds: 3,
            aws: 20,
            azure: 10,
            gcp: 20,
            operations: 10,
        }
    }
}

/// Accounts to scan and tuning knobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AWS shared-config profile names
    pub aws_profiles: Vec<String>,

    /// Azure subscription ids
    pub azure_subs: Vec<String>,

    /// GCP project ids
    pub gcp_projects: Vec<String>,

    pub workers: WorkerLimits,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_dir: Option<PathBuf>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| ConfigError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Locate and load the config file
    pub fn discover() -> Result<Self> {
        Self::load(find_config_file()?)
    }

    /// No account is configured for any provider
    pub fn is_empty(&self) -> bool {
        self.aws_profiles.is_empty() && self.azure_subs.is_empty() && self.gcp_projects.is_empty()
    }

    /// Inventory directory
    ///
    /// CLOUDSCOPE_INVENTORY_DIR wins over the config value, which wins over
    /// `./inventory`.
    pub fn inventory_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var("CLOUDSCOPE_INVENTORY_DIR") {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }

        self.inventory_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("inventory"))
    }
}
