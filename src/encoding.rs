//! SQL Value Encoder
//!
//! Every user-supplied value that ends up inside generated SQL passes through
//! here exactly once. The encoded forms (`SqlLiteral`, `SqlIdent`) can only be
//! constructed by this module, so the builders cannot receive raw text.
//!
//! Encoding is not idempotent: escaping already-escaped text doubles the
//! escapes (`O''Brien` becomes `O''''Brien`). Callers encode once.

use crate::error::{AttributionError, Result};
use crate::request::AttributionRequest;
use crate::sql::AttributionSqlParameters;
use crate::timezone::AppTimezone;
use crate::validation::is_valid_identifier;
use std::fmt;

/// A single-quoted SQL string literal, quotes included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlLiteral(String);

impl SqlLiteral {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A double-quoted SQL identifier, quotes included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlIdent(String);

impl SqlIdent {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape text for use between single quotes. Quotes are doubled and
/// backslashes (an escape character in Redshift literals) are doubled.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// Encode free text as a quoted literal. Statement terminators and NUL bytes
/// are rejected outright.
pub fn encode_literal(value: &str) -> Result<SqlLiteral> {
    if value.contains('\0') {
        return Err(AttributionError::Encoding(
            "Value contains a NUL character".to_string(),
        ));
    }
    if value.contains(';') {
        return Err(AttributionError::Encoding(format!(
            "Value must not contain a statement terminator: {}",
            value
        )));
    }
    Ok(SqlLiteral(format!("'{}'", escape_literal(value))))
}

/// Quote a schema/table identifier after checking its character set.
pub fn encode_ident(value: &str) -> Result<SqlIdent> {
    if !is_valid_identifier(value) {
        return Err(AttributionError::Encoding(format!(
            "Invalid identifier: {}",
            value
        )));
    }
    Ok(SqlIdent(format!("\"{}\"", value)))
}

/// Build the SQL parameters for a validated request, encoding every value
/// the builders interpolate.
pub fn encode_parameters(
    request: &AttributionRequest,
    timezone: AppTimezone,
) -> Result<AttributionSqlParameters> {
    let touch_point_names = request
        .touch_point_event_names
        .iter()
        .map(|name| encode_literal(name))
        .collect::<Result<Vec<_>>>()?;

    Ok(AttributionSqlParameters {
        db_name: request.project_id.clone(),
        schema_name: encode_ident(&request.app_id)?,
        touch_point_names,
        conversion_event_name: encode_literal(&request.conversion_event_name)?,
        time_scope: request.time_scope.clone(),
        timezone,
        compute_method: request.compute_method,
        attribution_window: request.attribution_window,
        model_type: request.model_type,
        position_weights: request.position_weights,
    })
}
