//! Pipeline repository backed by PostgreSQL
//!
//! Expected tables:
//!   pipelines(project_id, pipeline_id, region, data_source_arn)
//!   pipeline_app_timezones(project_id, app_id, timezone)

use crate::error::Result;
use crate::pipeline::{AppTimezoneEntry, Pipeline, PipelineResolver};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

pub struct PgPipelineResolver {
    pool: PgPool,
}

impl PgPipelineResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_timezones(&self, project_id: &str) -> Result<Vec<AppTimezoneEntry>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT app_id, timezone
            FROM pipeline_app_timezones
            WHERE project_id = $1
            ORDER BY app_id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(app_id, timezone)| AppTimezoneEntry { app_id, timezone })
            .collect())
    }
}

#[async_trait]
impl PipelineResolver for PgPipelineResolver {
    async fn get_pipeline_by_project_id(&self, project_id: &str) -> Result<Option<Pipeline>> {
        let row: Option<(String, String, Option<String>, Option<String>)> = sqlx::query_as(
            r#"
            SELECT project_id, pipeline_id, region, data_source_arn
            FROM pipelines
            WHERE project_id = $1
            LIMIT 1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((project_id, pipeline_id, region, data_source_arn)) = row else {
            debug!("No pipeline row for project {}", project_id);
            return Ok(None);
        };

        let timezone = self.load_timezones(&project_id).await?;
        Ok(Some(Pipeline {
            project_id,
            pipeline_id,
            region: region.unwrap_or_default(),
            data_source_arn,
            timezone,
        }))
    }
}
