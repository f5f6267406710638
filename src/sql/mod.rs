//! Attribution SQL generation
//!
//! Compiles validated, encoded `AttributionSqlParameters` into one Redshift
//! statement computing per-touch-point conversion credit. The model type only
//! selects a `CreditStrategy`; the windowing/ranking skeleton is shared.

pub mod builder;
pub mod strategy;
pub mod template;
pub mod window;

pub use builder::AttributionSqlBuilder;
pub use strategy::{CreditStrategy, TouchDirection};

use crate::encoding::{SqlIdent, SqlLiteral};
use crate::error::{AttributionError, Result};
use crate::request::{AttributionWindow, ComputeMethod, ModelType, PositionWeights, TimeScope};
use crate::timezone::AppTimezone;
use sqlparser::dialect::RedshiftSqlDialect;
use sqlparser::parser::Parser;
use tracing::{info, warn};

/// Clickstream event table inside each app schema
pub const EVENT_TABLE: &str = "event_v2";

/// Output columns of every attribution statement, in order
pub const RESULT_COLUMNS: [&str; 6] = [
    "touch_point_name",
    "trigger_count",
    "total_conversion",
    "triggers_with_conversion",
    "contribution",
    "contribution_rate",
];

/// Validated + encoded inputs of the SQL builders
#[derive(Debug, Clone)]
pub struct AttributionSqlParameters {
    /// Project id; names the warehouse database, not interpolated into SQL
    pub db_name: String,
    /// App id as a quoted identifier
    pub schema_name: SqlIdent,
    pub touch_point_names: Vec<SqlLiteral>,
    pub conversion_event_name: SqlLiteral,
    pub time_scope: TimeScope,
    pub timezone: AppTimezone,
    pub compute_method: ComputeMethod,
    pub attribution_window: AttributionWindow,
    pub model_type: ModelType,
    pub position_weights: PositionWeights,
}

impl AttributionSqlParameters {
    pub fn strategy(&self) -> CreditStrategy {
        CreditStrategy::for_model(self.model_type, self.position_weights)
    }
}

/// Build the attribution statement for the parameters' model type. The time
/// scope is left as dashboard parameter placeholders.
pub fn build_attribution_sql(params: &AttributionSqlParameters) -> Result<String> {
    build_with_strategy(params, params.strategy())
}

/// Build with an explicit credit strategy.
pub fn build_with_strategy(params: &AttributionSqlParameters, strategy: CreditStrategy) -> Result<String> {
    info!("🔧 Building attribution SQL for model {}", params.model_type);
    let sql = AttributionSqlBuilder::new(params, strategy).build();
    verify_sql(&template::render(&sql, &params.time_scope))?;
    info!("✅ Generated attribution SQL ({} chars)", sql.len());
    Ok(sql)
}

/// Build the statement with the request's own time scope filled in.
pub fn render_attribution_sql(params: &AttributionSqlParameters) -> Result<String> {
    let sql = build_attribution_sql(params)?;
    Ok(template::render(&sql, &params.time_scope))
}

/// Check that generated text parses as exactly one statement.
pub fn verify_sql(sql: &str) -> Result<()> {
    let statements = Parser::parse_sql(&RedshiftSqlDialect {}, sql).map_err(|e| {
        warn!("❌ Generated SQL failed syntax check: {}", e);
        AttributionError::Generation("Generated SQL failed syntax check".to_string())
    })?;
    if statements.len() != 1 {
        return Err(AttributionError::Generation(format!(
            "Expected one statement, generated {}",
            statements.len()
        )));
    }
    Ok(())
}
