//! Configuration loading and management

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("api_prefix must start with '/' (got '{0}')")]
    InvalidPrefix(String),

    #[error("pagination limits must be positive")]
    ZeroLimit,

    #[error("pagination.default_limit ({default}) exceeds pagination.max_limit ({max})")]
    DefaultAboveMax { default: usize, max: usize },
}

/// Page size settings for list endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size when the request has no usable `limit`
    pub default_limit: usize,

    /// Upper bound for `limit`
    pub max_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Server configuration
///
/// # Example
///
/// ```yaml
/// bind_address: 0.0.0.0:8080
/// api_prefix: /api
/// log_filter: warden=debug,tower_http=info
/// pagination:
///   default_limit: 20
///   max_limit: 200
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    /// Path prefix of every resource route
    pub api_prefix: String,

    /// Default `tracing` filter; `RUST_LOG` takes precedence
    pub log_filter: String,

    pub pagination: PaginationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            api_prefix: "/api".to_string(),
            log_filter: "info".to_string(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_prefix.starts_with('/') {
            return Err(ConfigError::InvalidPrefix(self.api_prefix.clone()));
        }
        let pagination = &self.pagination;
        if pagination.default_limit == 0 || pagination.max_limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if pagination.default_limit > pagination.max_limit {
            return Err(ConfigError::DefaultAboveMax {
                default: pagination.default_limit,
                max: pagination.max_limit,
            });
        }
        Ok(())
    }

    /// Prefix without a trailing slash (`/` becomes the empty string)
    pub fn normalized_prefix(&self) -> &str {
        self.api_prefix.trim_end_matches('/')
    }
}
