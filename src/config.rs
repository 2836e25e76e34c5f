//! YAML configuration file support.
//!
//! Deployments keep the store location and matcher knobs in a single YAML
//! file loaded at startup:
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! store:
//!   database_path: "data_final.json"
//!
//! matcher:
//!   threshold: 12
//!   prefix_length: 16
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vdedup_fingerprint::PREFIX_BITS;
use vdedup_match::MatchConfig;

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VdedupConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    /// Record store configuration.
    #[serde(default)]
    pub store: StoreYamlConfig,

    /// Matcher configuration.
    #[serde(default)]
    pub matcher: MatcherYamlConfig,
}

impl VdedupConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: VdedupConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;
        self.store.validate()?;
        self.matcher.validate()?;
        Ok(())
    }
}

impl Default for VdedupConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            store: StoreYamlConfig::default(),
            matcher: MatcherYamlConfig::default(),
        }
    }
}

/// Record store YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreYamlConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "store.database_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Matcher YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherYamlConfig {
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    #[serde(default = "default_prefix_length")]
    pub prefix_length: usize,
}

impl MatcherYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.threshold > 64 {
            return Err(ConfigLoadError::Validation(
                "matcher.threshold must be <= 64".to_string(),
            ));
        }
        if self.prefix_length > PREFIX_BITS {
            return Err(ConfigLoadError::Validation(format!(
                "matcher.prefix_length must be <= {PREFIX_BITS}"
            )));
        }
        Ok(())
    }

    /// Convert to the engine's per-request configuration.
    pub fn to_match_config(&self) -> MatchConfig {
        MatchConfig {
            threshold: self.threshold,
            prefix_length: self.prefix_length,
        }
    }
}

impl Default for MatcherYamlConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            prefix_length: default_prefix_length(),
        }
    }
}

fn default_database_path() -> String {
    "data_final.json".to_string()
}
fn default_threshold() -> u32 {
    12
}
fn default_prefix_length() -> usize {
    PREFIX_BITS
}
