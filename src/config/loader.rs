//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! configurations from YAML files.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::calculation::validate_tactic;
use crate::error::{EngineError, EngineResult};
use crate::models::{MarkupTactic, PricingDistributionConfig, TenderMarkupParameters};

use super::types::{EngineConfig, EngineMetadata, EngineSettings, RoundingConfig};

/// Loads and provides access to engine configuration.
///
/// The `ConfigLoader` reads YAML configuration files from a directory
/// and provides methods to query tactics, parameters and distribution rules.
///
/// # Directory Structure
///
/// The configuration directory should have the following structure:
/// ```text
/// config/default/
/// ├── engine.yaml               # Metadata, rounding defaults, default tactic
/// ├── parameters.yaml           # Default tender markup parameters
/// ├── pricing_distribution.yaml # Category kind -> base/markup targets
/// └── tactics/
///     └── standard.yaml         # One markup tactic per file
/// ```
///
/// # Example
///
/// ```no_run
/// use markup_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
///
/// let tactic = loader.get_tactic("standard").unwrap();
/// println!("Tactic: {}", tactic.name);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config/default")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing
    /// - Any file contains invalid YAML
    /// - The tactics directory holds no tactic files
    /// - The default tactic is not among the loaded tactics
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<EngineSettings>(&path.join("engine.yaml"))?;
        let parameters = Self::load_yaml::<TenderMarkupParameters>(&path.join("parameters.yaml"))?;
        let distribution =
            Self::load_yaml::<PricingDistributionConfig>(&path.join("pricing_distribution.yaml"))?;
        let tactics = Self::load_tactics(&path.join("tactics"))?;

        let config = EngineConfig::new(settings, parameters, distribution, tactics);

        let default_tactic = &config.settings().default_tactic;
        if !config.tactics().contains_key(default_tactic) {
            return Err(EngineError::TacticNotFound {
                name: default_tactic.clone(),
            });
        }

        debug!(
            path = %path.display(),
            tactics = config.tactics().len(),
            parameters = config.parameters().len(),
            "Loaded engine configuration"
        );

        Ok(Self { config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads all tactic files from the tactics directory.
    fn load_tactics(tactics_dir: &Path) -> EngineResult<Vec<MarkupTactic>> {
        let tactics_dir_str = tactics_dir.display().to_string();

        if !tactics_dir.exists() {
            return Err(EngineError::ConfigNotFound {
                path: tactics_dir_str,
            });
        }

        let entries = fs::read_dir(tactics_dir).map_err(|_| EngineError::ConfigNotFound {
            path: tactics_dir_str.clone(),
        })?;

        let mut tactics: Vec<MarkupTactic> = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: tactics_dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                let tactic = Self::load_yaml::<MarkupTactic>(&path)?;
                for violation in validate_tactic(&tactic) {
                    warn!(tactic = %tactic.name, violation = %violation, "Tactic has a structural problem");
                }
                if tactics.iter().any(|t| t.name == tactic.name) {
                    warn!(tactic = %tactic.name, path = %path.display(), "Duplicate tactic name, later file wins");
                }
                tactics.push(tactic);
            }
        }

        if tactics.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no tactic files found)", tactics_dir_str),
            });
        }

        // read_dir order is platform dependent
        tactics.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(tactics)
    }

    /// Returns the underlying engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the configuration metadata.
    pub fn engine(&self) -> &EngineMetadata {
        &self.config.settings().metadata
    }

    /// Gets a tactic by its name.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use markup_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config/default")?;
    /// let tactic = loader.get_tactic("standard")?;
    /// println!("Sequences: {}", tactic.sequences.len());
    /// # Ok::<(), markup_engine::error::EngineError>(())
    /// ```
    pub fn get_tactic(&self, name: &str) -> EngineResult<&MarkupTactic> {
        self.config
            .tactics()
            .get(name)
            .ok_or_else(|| EngineError::TacticNotFound {
                name: name.to_string(),
            })
    }

    /// Returns the tactic named as default in engine.yaml.
    pub fn default_tactic(&self) -> EngineResult<&MarkupTactic> {
        self.get_tactic(&self.config.settings().default_tactic)
    }

    /// Returns the names of all loaded tactics, sorted.
    pub fn tactic_names(&self) -> Vec<&str> {
        self.config.tactics().keys().map(String::as_str).collect()
    }

    /// Returns the default tender parameters.
    pub fn default_parameters(&self) -> &TenderMarkupParameters {
        self.config.parameters()
    }

    /// Returns the pricing distribution rules.
    pub fn pricing_distribution(&self) -> &PricingDistributionConfig {
        self.config.distribution()
    }

    /// Returns the rounding defaults.
    pub fn rounding(&self) -> RoundingConfig {
        self.config.settings().rounding
    }

    /// Returns the redistribution balance tolerance.
    pub fn balance_tolerance(&self) -> rust_decimal::Decimal {
        self.config.settings().balance_tolerance
    }
}
