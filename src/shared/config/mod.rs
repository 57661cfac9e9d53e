//! Application configuration module
//!
//! Provides the configuration consumed by the RPC transport and the
//! reconcilers. It is built once at startup and passed down explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default refresh interval (the backend data TTL)
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5 * 60;
/// Default per-request timeout
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default realtime channel buffer
const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend base URL, e.g. `https://project.example.co`
    pub backend_url: String,
    /// Public API key sent with every request
    pub api_key: String,
    /// Optional user access token
    pub access_token: Option<String>,
    /// Seconds between periodic refetches of a collection
    pub refresh_interval_secs: u64,
    /// Seconds before a single RPC call is abandoned
    pub request_timeout_secs: u64,
    /// Buffered change notifications per realtime channel
    pub channel_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            api_key: String::new(),
            access_token: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend_url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingValue("backend_url"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.backend_url.clone()));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingValue("api_key"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh_interval_secs",
                reason: "must be greater than zero",
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs",
                reason: "must be greater than zero",
            });
        }
        if self.channel_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "channel_buffer",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    fn parse(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file. Not validated: environment overrides still apply.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::parse(&source)
    }

    /// `<config dir>/basket-sync/config.toml`, when the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("basket-sync").join("config.toml"))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    backend_url: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    refresh_interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    channel_buffer: Option<usize>,
}

impl AppConfigBuilder {
    /// Set the backend URL
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Set the public API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the user access token
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn refresh_interval_secs(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = Some(secs);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    pub fn channel_buffer(mut self, buffer: usize) -> Self {
        self.channel_buffer = Some(buffer);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            backend_url: self
                .backend_url
                .ok_or(ConfigError::MissingValue("backend_url"))?,
            api_key: self.api_key.ok_or(ConfigError::MissingValue("api_key"))?,
            access_token: self.access_token,
            refresh_interval_secs: self
                .refresh_interval_secs
                .unwrap_or(defaults.refresh_interval_secs),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            channel_buffer: self.channel_buffer.unwrap_or(defaults.channel_buffer),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    #[error("could not parse config: {0}")]
    Parse(String),
    #[error("could not read config: {0}")]
    Io(String),
    #[error("could not build HTTP client: {0}")]
    HttpClient(String),
}
