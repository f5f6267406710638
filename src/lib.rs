//! Clickstream attribution analysis
//!
//! Validates attribution requests, compiles them into a single Redshift
//! statement per model type and hands the statement to a visualization
//! provider as a dashboard dataset.

pub mod api;
pub mod config;
pub mod encoding;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod reporting;
pub mod request;
pub mod service;
pub mod simulate;
pub mod sql;
pub mod timezone;
pub mod validation;

// Database module for PostgreSQL
pub mod db;

pub use error::{AttributionError, Result};
pub use service::AttributionAnalysisService;
