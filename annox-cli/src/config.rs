//! Configuration handling for the Annox CLI
//!
//! Supports loading configuration from annox.toml files with CLI argument overrides.

use annox_core::{AlignFormat, FeatureMode, Style, StyleRegistry};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub align: AlignConfig,
    /// Featureset styles, as consulted by masking
    #[serde(default)]
    pub styles: Vec<Style>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when neither -v nor -q is given
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Dialect assumed when --format is not given
    #[serde(default = "default_format")]
    pub format: AlignFormat,

    /// Query bases allowed to go missing between blocks of a perfect alignment
    #[serde(default)]
    pub align_error: u32,
}

// Default value functions
fn default_log_level() -> String { "info".to_string() }
fn default_format() -> AlignFormat { AlignFormat::ExonerateCigar }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            align_error: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            align: AlignConfig::default(),
            styles: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                // Try to find annox.toml in current directory
                let default_path = PathBuf::from("annox.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: annox.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::info!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// The configured styles, keyed by featureset id.
    pub fn registry(&self) -> StyleRegistry {
        StyleRegistry::from_styles(self.styles.iter().cloned())
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        let config = Self {
            styles: vec![
                Style::new("vertebrate_mRNA", FeatureMode::Alignment),
                Style::new("EST_Human", FeatureMode::Alignment)
                    .with_masked_by(["vertebrate_mRNA", "self"]),
                Style::new("EST_Mouse", FeatureMode::Alignment).with_masked_by(["self"]),
            ],
            ..Self::default()
        };
        toml::to_string_pretty(&config).context("Failed to serialize example configuration")
    }
}
