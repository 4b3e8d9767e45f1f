use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_PRESET_PREFIX;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    pub version: u32,
    #[serde(default)]
    pub store: StoreOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Key prefix under which preset values live in the medium.
    pub prefix: String,
    /// Reject saving a preset whose name another preset already uses.
    pub unique_names: bool,
    /// Append an integrity signature to every saved value.
    pub sign: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PRESET_PREFIX.to_string(),
            unique_names: true,
            sign: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            store: StoreOptions::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: StoreConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let prefix = &self.store.prefix;
        if prefix.is_empty() {
            return Err(ConfigError::Invalid("store prefix must not be empty".into()));
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "store prefix '{prefix}' must not contain whitespace"
            )));
        }

        Ok(())
    }
}
