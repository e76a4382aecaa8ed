use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info};

use super::messages::{DemoConfigResponse, ErrorBody};
use crate::error::DemoCallError;
use crate::session::CallConfig;

/// Hosted widget backend serving the demo tenant
pub const DEFAULT_CONFIG_URL: &str = "https://app.getvoxli.ai/api/widget/demo-config";

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Source of per-attempt call configuration
#[async_trait::async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch and validate a fresh `CallConfig`
    async fn fetch_config(&self) -> Result<CallConfig, DemoCallError>;
}

/// Fetches the demo config over HTTP
#[derive(Debug, Clone)]
pub struct HttpConfigFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpConfigFetcher {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let timeout_ms = if timeout_ms == 0 {
            DEFAULT_TIMEOUT_MS
        } else {
            timeout_ms
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to build demo config HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl ConfigSource for HttpConfigFetcher {
    async fn fetch_config(&self) -> Result<CallConfig, DemoCallError> {
        info!("Fetching demo config from {}", self.url);

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            error!("Demo config request failed: {} (url={})", e, self.url);
            DemoCallError::ConfigUnreachable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            // Body is optional; anything unparseable falls back to the generic message
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            error!("Demo config response error: {} {:?}", status, body.error);
            return Err(DemoCallError::ConfigUnavailable(
                body.error.unwrap_or_default(),
            ));
        }

        let body = response.json::<DemoConfigResponse>().await.map_err(|e| {
            error!("Demo config body unreadable: {}", e);
            DemoCallError::ConfigUnreachable(e.to_string())
        })?;

        info!(
            "Demo config loaded (business={:?}, has_assistant_id={}, has_key={})",
            body.business_name,
            body.assistant_id.as_deref().is_some_and(|v| !v.is_empty()),
            body.vapi_public_key.as_deref().is_some_and(|v| !v.is_empty()),
        );

        CallConfig::try_from(body)
    }
}
