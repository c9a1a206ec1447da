//! Config file handling

use std::path::PathBuf;

use crate::errors::{Result, RurlError};

/// rurl configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    /// Flags prepended to every invocation, from `[defaults] options`
    pub default_options: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: Self::default_config_dir(),
            default_options: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the config file (TOML format)
    pub fn load() -> Result<Self> {
        let config_dir = Self::default_config_dir();
        let config_file = config_dir.join("config.toml");

        if !config_file.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_file)
            .map_err(|e| RurlError::Config(format!("failed to read config: {}", e)))?;

        let mut config = Self::from_toml_str(&content)?;
        config.config_dir = config_dir;
        Ok(config)
    }

    fn from_toml_str(content: &str) -> Result<Self> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| RurlError::Config(format!("invalid config TOML: {}", e)))?;

        let default_options = toml_value
            .get("defaults")
            .and_then(|d| d.get("options"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            config_dir: Self::default_config_dir(),
            default_options,
        })
    }

    /// Get the default config directory. RURL_CONFIG_DIR overrides the
    /// platform default so tests and scripts can isolate themselves.
    fn default_config_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("RURL_CONFIG_DIR") {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        dirs::config_dir()
            .map(|p| p.join("rurl"))
            .unwrap_or_else(|| PathBuf::from(".rurl"))
    }
}
