//! Visualization provider client
//!
//! The provider owns dashboards, datasets and temporary views. This crate only
//! sends it a `VisualRequest` and reads back the handle.

use super::artifact::{ProviderHandle, VisualRequest};
use crate::error::{AttributionError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait VisualizationProvider: Send + Sync {
    /// Create or replace the dataset and append the visual, returning the
    /// dashboard handle.
    async fn publish(&self, request: &VisualRequest) -> Result<ProviderHandle>;
}

/// Provider reached over a JSON HTTP API
pub struct HttpVisualizationProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpVisualizationProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl VisualizationProvider for HttpVisualizationProvider {
    async fn publish(&self, request: &VisualRequest) -> Result<ProviderHandle> {
        let url = format!("{}/dashboards/visuals", self.base_url);
        debug!("Publishing visual {} to {}", request.visual.visual_id, url);

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("⚠️  Visualization provider returned {}", status);
            return Err(AttributionError::Provider(format!(
                "Provider API error ({}): {}",
                status, error_text
            )));
        }

        let handle: ProviderHandle = response.json().await?;
        Ok(handle)
    }
}
