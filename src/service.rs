//! Attribution Analysis Service
//!
//! Orchestrates one request end to end:
//! RECEIVED → VALIDATED → ENRICHED → DISPATCH → RENDER → SUCCEEDED / FAILED.
//! Collaborators are injected so tests can substitute doubles.

use crate::api::ApiResponse;
use crate::encoding::encode_parameters;
use crate::error::{AttributionError, Result};
use crate::pipeline::PipelineResolver;
use crate::reporting::{create_dashboard_visuals, DashboardArtifact, VisualizationProvider};
use crate::request::{Action, AttributionRequest, AttributionRequestBody, DashboardTarget};
use crate::sql::build_attribution_sql;
use crate::timezone::AppTimezone;
use crate::validation;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Returned when a preview comes back without an embed URL
pub const PREVIEW_NOT_READY: &str = "Failed to generate preview dashboard, please retry.";

pub struct AttributionAnalysisService {
    pipelines: Arc<dyn PipelineResolver>,
    provider: Arc<dyn VisualizationProvider>,
}

impl AttributionAnalysisService {
    pub fn new(
        pipelines: Arc<dyn PipelineResolver>,
        provider: Arc<dyn VisualizationProvider>,
    ) -> Self {
        Self { pipelines, provider }
    }

    /// Handle one attribution request and map the outcome to a response.
    pub async fn create_attribution_analysis_visual(
        &self,
        body: &AttributionRequestBody,
    ) -> ApiResponse {
        info!(
            "📥 Attribution request received (project={:?}, app={:?}, model={:?})",
            body.project_id, body.app_id, body.model_type
        );

        let request = match validation::parse(body) {
            Ok(request) => request,
            Err(failure) => {
                warn!("⚠️  Request rejected: {}", failure.message);
                return ApiResponse::fail(400, failure.message);
            }
        };
        debug!("Request validated: model={}, action={:?}", request.model_type, request.action);

        match self.run(&request).await {
            Ok(artifact) => {
                info!(
                    "✅ Attribution visual {} created on sheet {}",
                    artifact.visual_id, artifact.sheet_id
                );
                ApiResponse::ok(201, "", &artifact)
            }
            Err(err) => Self::error_response(err),
        }
    }

    async fn run(&self, request: &AttributionRequest) -> Result<DashboardArtifact> {
        let pipeline = self
            .pipelines
            .get_pipeline_by_project_id(&request.project_id)
            .await?
            .ok_or_else(|| AttributionError::PipelineNotFound(request.project_id.clone()))?;

        let timezone_name = self.pipelines.get_timezone_by_app_id(&pipeline, &request.app_id);
        // The timezone is pipeline data, so a bad value is a server fault.
        let timezone = AppTimezone::parse(&timezone_name).map_err(|e| {
            AttributionError::Config(format!("Pipeline {}: {}", pipeline.pipeline_id, e))
        })?;
        let params = encode_parameters(request, timezone)?;
        info!(
            "🔎 Enriched request with pipeline {} (timezone {})",
            pipeline.pipeline_id, timezone
        );

        let sheet_id = match &request.target {
            DashboardTarget::Fresh => Uuid::new_v4().to_string(),
            DashboardTarget::Existing { sheet_id, .. } => sheet_id.clone(),
        };

        let sql = build_attribution_sql(&params)?;

        let artifact = create_dashboard_visuals(
            self.provider.as_ref(),
            &sheet_id,
            &request.view_name,
            &sql,
            &pipeline,
            request,
        )
        .await?;

        if request.action == Action::Preview && artifact.embed_url.is_empty() {
            // The dataset may already exist in the provider at this point.
            return Err(AttributionError::Generation(PREVIEW_NOT_READY.to_string()));
        }

        Ok(artifact)
    }

    fn error_response(err: AttributionError) -> ApiResponse {
        let status = err.status_code();
        match err.client_message() {
            Some(message) if status < 500 => {
                warn!("⚠️  Request rejected ({}): {}", status, message);
                ApiResponse::fail(status, message)
            }
            Some(message) => {
                error!("❌ Generation failed: {}", message);
                ApiResponse::fail(status, message)
            }
            None => {
                error!("❌ Attribution request failed: {}", err);
                ApiResponse::server_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_collapse_to_generic_message() {
        let response = AttributionAnalysisService::error_response(AttributionError::Provider(
            "SELECT secret FROM x".to_string(),
        ));
        assert_eq!(response.status, 500);
        assert_eq!(response.message(), Some(crate::api::GENERIC_SERVER_ERROR));
    }

    #[test]
    fn test_config_errors_are_generic() {
        let response = AttributionAnalysisService::error_response(AttributionError::Config(
            "Unknown timezone: Mars/Olympus".to_string(),
        ));
        assert_eq!(response.status, 500);
        assert_eq!(response.message(), Some(crate::api::GENERIC_SERVER_ERROR));
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response =
            AttributionAnalysisService::error_response(AttributionError::PipelineNotFound("p9".into()));
        assert_eq!(response.status, 404);
        assert!(response.message().unwrap().contains("p9"));
    }
}
