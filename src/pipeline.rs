//! Pipeline lookup
//!
//! Pipelines are owned by the pipeline-management service; this crate only
//! reads them to learn each app's reporting timezone.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Timezone assigned to an app of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTimezoneEntry {
    pub app_id: String,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub project_id: String,
    pub pipeline_id: String,
    #[serde(default)]
    pub region: String,
    /// Warehouse data source the visualization provider reads from
    #[serde(default)]
    pub data_source_arn: Option<String>,
    #[serde(default)]
    pub timezone: Vec<AppTimezoneEntry>,
}

/// Timezone used when an app has no explicit entry
pub const DEFAULT_TIMEZONE: &str = "UTC";

#[async_trait]
pub trait PipelineResolver: Send + Sync {
    async fn get_pipeline_by_project_id(&self, project_id: &str) -> Result<Option<Pipeline>>;

    fn get_timezone_by_app_id(&self, pipeline: &Pipeline, app_id: &str) -> String {
        pipeline
            .timezone
            .iter()
            .find(|entry| entry.app_id == app_id)
            .map(|entry| entry.timezone.clone())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string())
    }
}

/// Pipelines held in memory, keyed by project id
#[derive(Default)]
pub struct InMemoryPipelineResolver {
    pipelines: HashMap<String, Pipeline>,
}

impl InMemoryPipelineResolver {
    pub fn new(pipelines: Vec<Pipeline>) -> Self {
        Self {
            pipelines: pipelines
                .into_iter()
                .map(|p| (p.project_id.clone(), p))
                .collect(),
        }
    }

    /// Load a JSON array of pipelines
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let pipelines: Vec<Pipeline> = serde_json::from_str(&content)?;
        info!("📦 Loaded {} pipelines from {}", pipelines.len(), path.display());
        Ok(Self::new(pipelines))
    }
}

#[async_trait]
impl PipelineResolver for InMemoryPipelineResolver {
    async fn get_pipeline_by_project_id(&self, project_id: &str) -> Result<Option<Pipeline>> {
        let pipeline = self.pipelines.get(project_id).cloned();
        debug!("Pipeline lookup for {}: found={}", project_id, pipeline.is_some());
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> Pipeline {
        Pipeline {
            project_id: "p1".to_string(),
            pipeline_id: "pipe-1".to_string(),
            region: "us-east-1".to_string(),
            data_source_arn: None,
            timezone: vec![AppTimezoneEntry {
                app_id: "a1".to_string(),
                timezone: "Asia/Shanghai".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_lookup_and_timezone() {
        let resolver = InMemoryPipelineResolver::new(vec![pipeline()]);
        let found = resolver.get_pipeline_by_project_id("p1").await.unwrap().unwrap();
        assert_eq!(resolver.get_timezone_by_app_id(&found, "a1"), "Asia/Shanghai");
        assert_eq!(resolver.get_timezone_by_app_id(&found, "other"), DEFAULT_TIMEZONE);
        assert!(resolver.get_pipeline_by_project_id("missing").await.unwrap().is_none());
    }

    #[test]
    fn test_pipeline_json_shape() {
        let json = r#"[{"projectId":"p1","pipelineId":"x","timezone":[{"appId":"a1","timezone":"+08:00"}]}]"#;
        let pipelines: Vec<Pipeline> = serde_json::from_str(json).unwrap();
        assert_eq!(pipelines[0].timezone[0].timezone, "+08:00");
        assert_eq!(pipelines[0].region, "");
    }
}
