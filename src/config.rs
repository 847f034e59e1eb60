//! Configuration management for scan-snapshot
//!
//! All configuration is loaded from `./config/scan-snapshot.toml`.
//! Defaults live in the config template, not in source code.

use serde::Deserialize;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::scan::ScanKind;
use crate::store::SqliteStoreOptions;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/scan-snapshot.toml";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = include_str!("../config/scan-snapshot.toml");

/// Environment variable overriding `paths.home_dir`
pub const HOME_ENV: &str = "SCAN_SNAPSHOT_HOME";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub exports: ExportsConfig,
}

/// Input and output file locations
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub home_dir: PathBuf,
    pub agencies_file: PathBuf,
    pub current_federal_file: PathBuf,
    pub unique_agencies_file: PathBuf,
    pub clean_current_federal_file: PathBuf,
    pub results_dir: PathBuf,
}

/// Document store settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub name: String,
    #[serde(default)]
    pub atomic_snapshot: bool,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Byproduct export toggles
#[derive(Debug, Clone, Deserialize)]
pub struct ExportsConfig {
    #[serde(default = "default_true")]
    pub write_unique_agencies: bool,
    #[serde(default = "default_true")]
    pub write_clean_inventory: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            write_unique_agencies: true,
            write_clean_inventory: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path, applying the home override
    /// from the environment.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?
            .with_home_override(std::env::var_os(HOME_ENV).map(PathBuf::from));
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Replace `paths.home_dir` when an override is given and non-empty.
    pub fn with_home_override(mut self, home: Option<PathBuf>) -> Self {
        if let Some(home) = home.filter(|h| !h.as_os_str().is_empty()) {
            self.paths.home_dir = home;
        }
        self
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required_paths = [
            ("paths.home_dir", &self.paths.home_dir),
            ("paths.agencies_file", &self.paths.agencies_file),
            ("paths.current_federal_file", &self.paths.current_federal_file),
            ("paths.unique_agencies_file", &self.paths.unique_agencies_file),
            ("paths.clean_current_federal_file", &self.paths.clean_current_federal_file),
            ("paths.results_dir", &self.paths.results_dir),
            ("database.path", &self.database.path),
        ];
        for (field, path) in required_paths {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: field.to_string(),
                });
            }
        }

        if self.database.name.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "database.name".to_string(),
            });
        }
        if self.database.busy_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.busy_timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Resolve a configured path against the home directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.home_dir.join(path)
        }
    }

    pub fn agencies_path(&self) -> PathBuf {
        self.resolve(&self.paths.agencies_file)
    }

    pub fn current_federal_path(&self) -> PathBuf {
        self.resolve(&self.paths.current_federal_file)
    }

    pub fn unique_agencies_path(&self) -> PathBuf {
        self.resolve(&self.paths.unique_agencies_file)
    }

    pub fn clean_inventory_path(&self) -> PathBuf {
        self.resolve(&self.paths.clean_current_federal_file)
    }

    /// Default results file for a scan kind.
    pub fn results_path(&self, kind: ScanKind) -> PathBuf {
        self.resolve(&self.paths.results_dir).join(kind.results_file_name())
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database.path)
    }

    pub fn store_options(&self) -> SqliteStoreOptions {
        SqliteStoreOptions {
            name: self.database.name.clone(),
            atomic_snapshot: self.database.atomic_snapshot,
            busy_timeout_ms: self.database.busy_timeout_ms,
        }
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        Self::create_default_config_at(Path::new(CONFIG_PATH))
    }

    pub fn create_default_config_at(path: &Path) -> Result<PathBuf, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is an interactive terminal
    pub fn is_interactive() -> bool {
        io::stdin().is_terminal()
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}
