//! Load — config loading from file and environment variables.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::model::DecoderConfig;

const DEFAULT_CONFIG_PATH: &str = "/etc/haproxy-decode/decoder.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {reason}")]
    Env { key: &'static str, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl DecoderConfig {
    /// Load configuration.
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("DECODER_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override settings from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DECODER_ON_MALFORMED") {
            self.on_malformed = v.parse().map_err(|reason| ConfigError::Env {
                key: "DECODER_ON_MALFORMED",
                reason,
            })?;
        }
        if let Some(v) = lookup("DECODER_OUTPUT") {
            self.output = v.parse().map_err(|reason| ConfigError::Env {
                key: "DECODER_OUTPUT",
                reason,
            })?;
        }
        if let Some(v) = lookup("DECODER_LOG") {
            self.log_filter = v;
        }
        if let Some(v) = lookup("DECODER_REPORT_METRICS") {
            self.report_metrics = v.parse().map_err(|e: std::str::ParseBoolError| ConfigError::Env {
                key: "DECODER_REPORT_METRICS",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
