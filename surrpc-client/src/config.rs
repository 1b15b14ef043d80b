//! Client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via SURRPC_CONFIG)
//! 3. Environment variables

use crate::http::DEFAULT_REQUEST_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use surrpc_protocol::{CborFormatter, Formatter, JsonFormatter};

/// Default endpoint when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";

/// Wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Cbor,
    Json,
}

impl Format {
    pub fn formatter(self) -> Arc<dyn Formatter> {
        match self {
            Format::Cbor => Arc::new(CborFormatter),
            Format::Json => Arc::new(JsonFormatter),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cbor" => Some(Format::Cbor),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// How the endpoint path is treated before connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointTransform {
    /// Append `/rpc` unless the path already ends with it.
    #[default]
    Auto,
    /// Use the endpoint as given.
    Preserve,
}

impl EndpointTransform {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Some(EndpointTransform::Auto),
            "preserve" => Some(EndpointTransform::Preserve),
            _ => None,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server endpoint URL.
    pub endpoint: String,
    /// Wire encoding.
    pub format: Format,
    /// Endpoint path handling.
    pub endpoint_transform: EndpointTransform,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Namespace selected after connecting.
    pub namespace: Option<String>,
    /// Database selected after connecting.
    pub database: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            format: Format::default(),
            endpoint_transform: EndpointTransform::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            namespace: None,
            database: None,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_endpoint_transform(mut self, transform: EndpointTransform) -> Self {
        self.endpoint_transform = transform;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("SURRPC_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: ClientConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by variable name. A value that does not
    /// parse fails the whole load.
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(endpoint) = lookup("SURRPC_ENDPOINT") {
            self.endpoint = endpoint;
        }

        if let Some(format) = lookup("SURRPC_FORMAT") {
            self.format = Format::parse(&format)
                .ok_or_else(|| invalid_override("SURRPC_FORMAT", &format, "cbor or json"))?;
        }

        if let Some(transform) = lookup("SURRPC_ENDPOINT_TRANSFORM") {
            self.endpoint_transform = EndpointTransform::parse(&transform).ok_or_else(|| {
                invalid_override("SURRPC_ENDPOINT_TRANSFORM", &transform, "auto or preserve")
            })?;
        }

        if let Some(timeout) = lookup("SURRPC_REQUEST_TIMEOUT") {
            self.request_timeout_secs = timeout.parse().map_err(|_| {
                invalid_override("SURRPC_REQUEST_TIMEOUT", &timeout, "a number of seconds")
            })?;
        }

        if let Some(ns) = lookup("SURRPC_NAMESPACE") {
            self.namespace = Some(ns);
        }

        if let Some(db) = lookup("SURRPC_DATABASE") {
            self.database = Some(db);
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::ValidationError(
                "endpoint must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.namespace.is_none() && self.database.is_some() {
            return Err(ConfigError::ValidationError(
                "database requires a namespace".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn invalid_override(var: &str, value: &str, expected: &str) -> ConfigError {
    tracing::warn!(var, value, "invalid configuration override");
    ConfigError::ValidationError(format!("{var}={value:?}: expected {expected}"))
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
