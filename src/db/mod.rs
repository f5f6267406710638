//! Database module for PostgreSQL connection and pipeline metadata
//!
//! Pipelines are written by the pipeline-management service; this module only reads them.

pub mod connection;
pub mod pipeline_repo;

pub use connection::init_pool;
pub use pipeline_repo::PgPipelineResolver;
