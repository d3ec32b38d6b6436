//! [`SessionApi`] over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use estate_core::config::EndpointConfig;
use estate_core::error::{AppError, ErrorKind};
use estate_core::result::AppResult;
use estate_core::traits::SessionApi;
use estate_core::types::AuditEntry;

/// Body returned by the renewal endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    token: String,
}

/// Session endpoints of the estate admin API.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    /// Endpoint configuration.
    config: EndpointConfig,
    /// Shared connection pool.
    http_client: reqwest::Client,
}

impl HttpSessionApi {
    /// Builds a client with the configured request timeout.
    pub fn new(config: EndpointConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    "Failed to create HTTP client",
                    e,
                )
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    async fn post(
        &self,
        path: &str,
        token: &str,
        body: &serde_json::Value,
        kind: ErrorKind,
    ) -> AppResult<reqwest::Response> {
        let url = self.config.url(path);
        debug!(url = %url, "POST");

        self.http_client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AppError::with_source(kind, format!("POST {url} failed: {e}"), e))
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn refresh(&self, token: &str) -> AppResult<String> {
        let response = self
            .post(
                &self.config.refresh_path,
                token,
                &serde_json::json!({}),
                ErrorKind::Renewal,
            )
            .await?;

        let body: RefreshResponse = response.json().await.map_err(|e| {
            AppError::with_source(ErrorKind::Renewal, "Malformed token refresh response", e)
        })?;

        if body.token.trim().is_empty() {
            return Err(AppError::renewal("Token refresh returned an empty token"));
        }
        Ok(body.token)
    }

    async fn logout(&self, token: &str) -> AppResult<()> {
        self.post(
            &self.config.logout_path,
            token,
            &serde_json::json!({}),
            ErrorKind::Transport,
        )
        .await?;
        Ok(())
    }

    async fn audit(&self, token: &str, entry: &AuditEntry) -> AppResult<()> {
        let body = serde_json::to_value(entry)?;
        self.post(&self.config.audit_path, token, &body, ErrorKind::Transport)
            .await?;
        Ok(())
    }
}
