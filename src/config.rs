//! Configuration parsing and structures

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::adapter::AdapterOptions;
use crate::builder::AdapterBuilder;
use crate::env::substitute_env_vars;
use crate::error::AdapterError;

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Bucket and credentials
    pub gcs: GcsConfig,

    /// Adapter behaviour policies
    #[serde(default)]
    pub adapter: AdapterOptions,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Cloud Storage connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GcsConfig {
    /// Bucket name
    pub bucket: String,

    /// Service account email
    pub service_account: String,

    /// Path to the service account JSON key
    pub key_file: Option<PathBuf>,

    /// Inline service account JSON key, usually `${VAR}` substituted
    pub key_json: Option<String>,

    /// Application name sent as the user agent
    pub application_name: Option<String>,

    /// Custom endpoint URL (for emulators such as fake-gcs-server)
    pub endpoint: Option<String>,

    /// Key prefix for rooting the adapter at a subpath
    pub prefix: Option<String>,

    /// HTTP request timeout
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a YAML string, substituting `${VAR}` references first
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let content = substitute_env_vars(content)?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gcs.bucket.is_empty() {
            return Err(ConfigError::ValidationError(
                "gcs.bucket cannot be empty".to_string(),
            ));
        }

        match (&self.gcs.key_file, &self.gcs.key_json) {
            (None, None) => Err(ConfigError::ValidationError(
                "one of gcs.key_file or gcs.key_json is required".to_string(),
            )),
            (Some(_), Some(_)) => Err(ConfigError::ValidationError(
                "gcs.key_file and gcs.key_json are mutually exclusive".to_string(),
            )),
            _ => Ok(()),
        }?;

        if self.adapter.delete_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "adapter.delete_concurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder pre-populated from this configuration
    pub fn builder(&self) -> AdapterBuilder {
        let gcs = &self.gcs;
        let mut builder = AdapterBuilder::new()
            .bucket(&gcs.bucket)
            .service_account(&gcs.service_account)
            .options(self.adapter.clone());

        if let Some(path) = &gcs.key_file {
            builder = builder.key_file(path);
        }
        if let Some(json) = &gcs.key_json {
            builder = builder.key_json(json);
        }
        if let Some(name) = &gcs.application_name {
            builder = builder.application_name(name);
        }
        if let Some(endpoint) = &gcs.endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(prefix) = &gcs.prefix {
            builder = builder.prefix(prefix);
        }
        if let Some(timeout) = gcs.timeout {
            builder = builder.timeout(timeout);
        }

        builder
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for AdapterError {
    fn from(err: ConfigError) -> Self {
        AdapterError::config_with("invalid configuration file", err)
    }
}
