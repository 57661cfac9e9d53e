use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use std::time::Duration;

/// Environment override for the backend URL
pub const ENV_BACKEND_URL: &str = "BASKET_BACKEND_URL";
/// Environment override for the public API key
pub const ENV_API_KEY: &str = "BASKET_API_KEY";
/// Environment override for the access token
pub const ENV_ACCESS_TOKEN: &str = "BASKET_ACCESS_TOKEN";

/// Client configuration wrapper.
///
/// Constructed once at startup and shared by reference with the RPC client
/// and every reconciler.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    /// Wrap an already validated configuration
    pub fn new(app: AppConfig) -> Self {
        Self { app }
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self::new(builder.build()?))
    }

    /// Apply `BASKET_*` environment overrides on top of `app` and validate
    pub fn from_env(app: AppConfig) -> Result<Self, ConfigError> {
        let mut app = app;
        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            app.backend_url = url;
        }
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            app.api_key = key;
        }
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            app.access_token = Some(token).filter(|t| !t.is_empty());
        }
        app.validate()?;
        Ok(Self { app })
    }

    /// Load the default config file if present, then apply env overrides
    pub fn load_default() -> Result<Self, ConfigError> {
        let app = match AppConfig::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading config file");
                AppConfig::read(&path)?
            }
            _ => AppConfig::default(),
        };
        Self::from_env(app)
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    pub fn backend_url(&self) -> &str {
        self.app.backend_url.trim_end_matches('/')
    }

    pub fn api_key(&self) -> &str {
        &self.app.api_key
    }

    /// Token sent as bearer credentials; falls back to the public key
    pub fn bearer_token(&self) -> &str {
        self.app.access_token.as_deref().unwrap_or(&self.app.api_key)
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.app.access_token = token;
    }

    /// Get the full URL of a stored procedure
    pub fn rpc_url(&self, procedure: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.backend_url(), procedure)
    }

    pub fn refresh_interval(&self) -> Duration {
        self.app.refresh_interval()
    }

    pub fn request_timeout(&self) -> Duration {
        self.app.request_timeout()
    }

    pub fn channel_buffer(&self) -> usize {
        self.app.channel_buffer
    }
}
