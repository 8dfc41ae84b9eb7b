//! planforge configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main planforge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Orchestration behavior
    pub orchestration: OrchestrationConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .planforge.yml
        let local_config = PathBuf::from(".planforge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/planforge/planforge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("planforge").join("planforge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for session records
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/planforge on Linux)
        let data_dir = dirs::data_dir()
            .map(|d| d.join("planforge"))
            .unwrap_or_else(|| PathBuf::from(".planforge"));
        Self { data_dir }
    }
}

impl StorageConfig {
    /// Session store directory for a project, keyed by its root path
    pub fn project_dir(&self, project_root: &Path) -> PathBuf {
        let key: String = project_root
            .to_string_lossy()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        self.data_dir.join("projects").join(key)
    }
}

/// Orchestration behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Retries per phase step on collaborator failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Fraction of the context budget still available, in [0.0, 1.0].
    /// Below 0.3 the allocation planner caps agent counts at 2.
    #[serde(rename = "context-budget")]
    pub context_budget: f64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            context_budget: 1.0,
        }
    }
}
