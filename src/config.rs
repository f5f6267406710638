//! Server configuration from CLI flags and environment

use crate::error::{AttributionError, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "attribution-server")]
#[command(about = "HTTP service creating attribution analysis dashboards")]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    #[arg(long, env = "ATTRIBUTION_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// PostgreSQL URL holding the pipeline tables
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// JSON file with an array of pipelines
    #[arg(long, env = "PIPELINES_FILE")]
    pub pipelines_file: Option<PathBuf>,

    /// Base URL of the visualization provider API
    #[arg(long, env = "VISUALIZATION_PROVIDER_URL", default_value = "http://localhost:9090")]
    pub visualization_url: String,

    #[arg(long, env = "VISUALIZATION_API_KEY")]
    pub visualization_api_key: Option<String>,
}

/// Where pipelines are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSource {
    File(PathBuf),
    Database(String),
}

impl ServerConfig {
    /// Exactly one of `pipelines_file` / `database_url` must be set.
    pub fn pipeline_source(&self) -> Result<PipelineSource> {
        match (&self.pipelines_file, &self.database_url) {
            (Some(path), None) => Ok(PipelineSource::File(path.clone())),
            (None, Some(url)) => Ok(PipelineSource::Database(url.clone())),
            (Some(_), Some(_)) => Err(AttributionError::Config(
                "Set either PIPELINES_FILE or DATABASE_URL, not both".to_string(),
            )),
            (None, None) => Err(AttributionError::Config(
                "No pipeline source configured (PIPELINES_FILE or DATABASE_URL)".to_string(),
            )),
        }
    }
}
