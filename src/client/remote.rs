//! RPC Transport
//!
//! Calls backend stored procedures over HTTP (`POST /rest/v1/rpc/{name}`) and
//! folds every failure into a [`NetworkError`] kind. Nothing above this layer
//! sees HTTP status codes or transport exceptions.

use crate::client::config::Config;
use crate::shared::config::ConfigError;
use crate::shared::error::{NetworkError, RpcResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// HTTP client for backend stored procedures
#[derive(Debug, Clone)]
pub struct RemoteClient {
    config: Config,
    client: Client,
}

impl RemoteClient {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Call a procedure and decode its JSON result
    pub async fn call<P, R>(&self, procedure: &str, params: &P) -> RpcResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(procedure, params).await?;
        response.json::<R>().await.map_err(|e| {
            tracing::warn!(procedure, error = %e, "could not decode rpc response");
            NetworkError::Serialization
        })
    }

    async fn send<P>(&self, procedure: &str, params: &P) -> RpcResult<reqwest::Response>
    where
        P: Serialize + ?Sized,
    {
        let url = self.config.rpc_url(procedure);
        tracing::debug!(procedure, "rpc call");

        let response = self
            .client
            .post(&url)
            .header("apikey", self.config.api_key())
            .header(
                "Authorization",
                format!("Bearer {}", self.config.bearer_token()),
            )
            .header("Content-Type", "application/json")
            .json(params)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(procedure, error = %e, "rpc transport failure");
                NetworkError::Unknown
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            let kind = NetworkError::from_status(status.as_u16());
            tracing::warn!(
                procedure,
                status = status.as_u16(),
                kind = kind.as_str(),
                body = %error_text,
                "rpc call failed"
            );
            return Err(kind);
        }

        Ok(response)
    }
}
