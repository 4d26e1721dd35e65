//! Configuration management for the extractor
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (extractor.toml)
//! - Environment variables (JSON_EXTRACTOR__*)
//!
//! ## Example config file (extractor.toml):
//! ```toml
//! [extraction]
//! strict_modifiers = true
//! cardinality = "sequence"
//! max_depth = 32
//! ```

use config_crate::{Config, ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};

/// Main configuration for the extractor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Extraction behaviour
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Settings threaded through schema compilation and every extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Fail when a modifier name resolves to nothing for a value.
    /// When off, such values pass through unchanged.
    #[serde(default = "default_true")]
    pub strict_modifiers: bool,

    /// What to do when a non-array field matches more than one value
    #[serde(default)]
    pub cardinality: CardinalityPolicy,

    /// Maximum nesting of sub-schemas
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Resolution for a non-array field that matched several values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardinalityPolicy {
    /// Keep all matches as a sequence
    #[default]
    Sequence,
    /// Raise `AmbiguousCardinality`
    Error,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    32
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strict_modifiers: true,
            cardinality: CardinalityPolicy::Sequence,
            max_depth: default_max_depth(),
        }
    }
}

impl ExtractionConfig {
    /// Same settings with strict modifiers switched on or off
    pub fn with_strict_modifiers(mut self, strict: bool) -> Self {
        self.strict_modifiers = strict;
        self
    }

    /// Same settings with a different cardinality policy
    pub fn with_cardinality(mut self, policy: CardinalityPolicy) -> Self {
        self.cardinality = policy;
        self
    }
}

impl ExtractorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, optionally layering a specific file on top
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_layered(config_path, None)
    }

    /// File layers plus an environment layer; `env` replaces the process environment
    fn load_layered(config_path: Option<&str>, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "extractor.toml",
            ".extractor.toml",
            "config/extractor.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "json-extractor", "extractor") {
            let xdg_config = config_dir.config_dir().join("extractor.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // JSON_EXTRACTOR__EXTRACTION__STRICT_MODIFIERS=false
        builder = builder.add_source(env_source(env));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> std::io::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// `JSON_EXTRACTOR__SECTION__KEY` variables, read from `env` when given
fn env_source(env: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix("JSON_EXTRACTOR")
        .separator("__")
        .try_parsing(true)
        .source(env)
}
