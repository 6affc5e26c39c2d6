use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::logging_config::LoggingConfig;
use super::transfer_config::{CacheConfig, DestinationConfig, SourceConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("source directory '{0}' does not exist or is not a directory")]
    InvalidSource(String),
    #[error("destination folder must not be empty")]
    EmptyDestinationFolder,
    #[error("cache prefix must not be empty and must not contain path separators")]
    InvalidCachePrefix,
    #[error("export prefix must not be empty and must not contain path separators")]
    InvalidExportPrefix,
    #[error("file extension must not contain path separators or dots")]
    InvalidExtension,
    #[error("invalid PACS settings: {0}")]
    InvalidPacs(String),
}

/// Top-level configuration for one transfer run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string without validating it
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Validate inputs before any work starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.source.path.is_dir() {
            return Err(ConfigError::InvalidSource(
                self.source.path.display().to_string(),
            ));
        }

        if !is_name_component(&self.cache.prefix) {
            return Err(ConfigError::InvalidCachePrefix);
        }
        let extension = self.cache.extension.trim();
        if extension.contains(['/', '\\', '.']) {
            return Err(ConfigError::InvalidExtension);
        }

        match &self.destination {
            DestinationConfig::Folder { path, prefix } => {
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::EmptyDestinationFolder);
                }
                if !is_name_component(prefix) {
                    return Err(ConfigError::InvalidExportPrefix);
                }
            }
            DestinationConfig::Pacs { local_aet, remote } => {
                dimse::DimseConfig::with_local_aet(local_aet.as_str())
                    .validate()
                    .map_err(|e| ConfigError::InvalidPacs(e.to_string()))?;
                remote
                    .validate()
                    .map_err(|e| ConfigError::InvalidPacs(e.to_string()))?;
            }
        }

        Ok(())
    }
}

/// A non-empty file name fragment that cannot leave its directory
fn is_name_component(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.contains(['/', '\\']) && value != "." && value != ".."
}
