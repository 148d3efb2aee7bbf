//! Configuration management for mazekeeper
//!
//! Handles the ~/.mazekeeper/ directory structure and config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::grid::generate::GeneratorOptions;
use crate::models::TraversalPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fallback filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            planner: PlannerConfig::default(),
            session: SessionConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlannerConfig {
    pub policy: TraversalPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_steps: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_steps: 100_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub rows: usize,
    pub cols: usize,
    pub keys: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let defaults = GeneratorOptions::default();
        Self {
            rows: defaults.rows,
            cols: defaults.cols,
            keys: defaults.keys,
        }
    }
}

impl GeneratorConfig {
    pub fn options(&self, seed: Option<u64>) -> GeneratorOptions {
        GeneratorOptions {
            rows: self.rows,
            cols: self.cols,
            keys: self.keys,
            seed,
        }
    }
}

/// Returns the path to the mazekeeper home directory (~/.mazekeeper)
pub fn mazekeeper_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".mazekeeper"))
}

/// Returns paths to all mazekeeper directories
pub struct MazePaths {
    pub root: PathBuf,
    pub config: PathBuf,
    pub db: PathBuf,
    pub db_file: PathBuf,
    pub exports: PathBuf,
}

impl MazePaths {
    pub fn new() -> Result<Self> {
        Ok(Self::at(mazekeeper_home()?))
    }

    /// Layout rooted somewhere other than the home directory
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config: root.join("config.toml"),
            db: root.join("db"),
            db_file: root.join("db/mazekeeper.db"),
            exports: root.join("exports"),
            root,
        }
    }

    /// Create all directories if they don't exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create mazekeeper root")?;
        fs::create_dir_all(&self.db).context("Failed to create db directory")?;
        fs::create_dir_all(&self.exports).context("Failed to create exports directory")?;
        Ok(())
    }

    /// Check if mazekeeper has been initialized
    pub fn is_initialized(&self) -> bool {
        self.config.exists() && self.db_file.exists()
    }
}

/// Load configuration from disk, defaults when there is no config.toml
pub fn load_config(paths: &MazePaths) -> Result<Config> {
    if !paths.config.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&paths.config).context("Failed to read config.toml")?;
    toml::from_str(&content).context("Failed to parse config.toml")
}

/// Save configuration to disk
pub fn save_config(paths: &MazePaths, config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&paths.config, content).context("Failed to write config.toml")?;
    Ok(())
}
