//! Attribution Request Validator
//!
//! Checks structural and semantic validity of an incoming request before any
//! SQL is generated. Failures are returned as values, never raised.

use crate::request::{
    Action, AttributionRequest, AttributionRequestBody, AttributionWindow, ChartType,
    ComputeMethod, DashboardTarget, Locale, ModelType, PositionWeights, TimeScope, TimeUnit,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

/// Identifiers are interpolated as schema / view names
const MAX_IDENTIFIER_LEN: usize = 127;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { valid: true, message: None }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { valid: false, message: Some(message.into()) }
    }
}

/// Structured validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub message: String,
}

impl ValidationFailure {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    })
}

/// True when `value` can be used as a schema, database or view name.
pub fn is_valid_identifier(value: &str) -> bool {
    value.len() <= MAX_IDENTIFIER_LEN && identifier_pattern().is_match(value)
}

/// Check a request without producing the typed form.
pub fn validate(body: &AttributionRequestBody) -> ValidationResult {
    match parse(body) {
        Ok(_) => ValidationResult::ok(),
        Err(failure) => ValidationResult::fail(failure.message),
    }
}

/// Validate and convert the wire body into a typed request.
pub fn parse(body: &AttributionRequestBody) -> Result<AttributionRequest, ValidationFailure> {
    let project_id = required_identifier(&body.project_id, "projectId")?;
    let app_id = required_identifier(&body.app_id, "appId")?;

    let model_type = match body.model_type.as_deref() {
        None => return Err(ValidationFailure::new("modelType is required")),
        Some(value) => ModelType::parse(value).ok_or_else(|| {
            ValidationFailure::new(format!("Unsupported attribution model type: {}", value))
        })?,
    };

    let touch_point = required_text(&body.touch_point_event_name, "touchPointEventName")?;
    let mut touch_point_event_names = vec![touch_point];
    for name in &body.additional_touch_point_event_names {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationFailure::new(
                "additionalTouchPointEventNames must not contain empty names",
            ));
        }
        if !touch_point_event_names.iter().any(|existing| existing == name) {
            touch_point_event_names.push(name.to_string());
        }
    }

    let conversion_event_name = required_text(&body.conversion_event_name, "conversionEventName")?;
    if touch_point_event_names.contains(&conversion_event_name) {
        return Err(ValidationFailure::new(format!(
            "Conversion event '{}' cannot also be a touch point",
            conversion_event_name
        )));
    }

    let time_scope = parse_time_scope(body)?;
    let target = parse_target(body)?;
    let view_name = required_identifier(&body.view_name, "viewName")?;

    let action = match body.action.as_deref() {
        None => return Err(ValidationFailure::new("action is required")),
        Some(value) => Action::parse(value)
            .ok_or_else(|| ValidationFailure::new(format!("Unsupported action: {}", value)))?,
    };

    let locale = optional_enum(&body.locale, "locale", Locale::parse)?.unwrap_or_default();
    let chart_type =
        optional_enum(&body.chart_type, "chartType", ChartType::parse)?.unwrap_or_default();
    let compute_method =
        optional_enum(&body.compute_method, "computeMethod", ComputeMethod::parse)?
            .unwrap_or_default();

    let attribution_window = parse_window(body)?;
    let position_weights = parse_position_weights(body, model_type)?;

    debug!(
        "Validated attribution request: project={}, app={}, model={}",
        project_id, app_id, model_type
    );

    Ok(AttributionRequest {
        project_id,
        app_id,
        model_type,
        touch_point_event_names,
        conversion_event_name,
        time_scope,
        target,
        locale,
        chart_type,
        view_name,
        action,
        compute_method,
        attribution_window,
        position_weights,
    })
}

fn required_text(value: &Option<String>, field: &str) -> Result<String, ValidationFailure> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ValidationFailure::new(format!("{} is required", field))),
    }
}

fn required_identifier(value: &Option<String>, field: &str) -> Result<String, ValidationFailure> {
    let text = required_text(value, field)?;
    if !is_valid_identifier(&text) {
        return Err(ValidationFailure::new(format!(
            "{} must start with a letter or underscore and contain only letters, digits or underscores",
            field
        )));
    }
    Ok(text)
}

fn optional_enum<T>(
    value: &Option<String>,
    field: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, ValidationFailure> {
    match value.as_deref() {
        None => Ok(None),
        Some(raw) => parse(raw)
            .map(Some)
            .ok_or_else(|| ValidationFailure::new(format!("Unsupported {}: {}", field, raw))),
    }
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ValidationFailure> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationFailure::new(format!("{} must be a date in YYYY-MM-DD format", field))
    })
}

fn parse_time_scope(body: &AttributionRequestBody) -> Result<TimeScope, ValidationFailure> {
    let has_absolute = body.time_start.is_some() || body.time_end.is_some();
    let has_relative = body.last_n.is_some() || body.time_unit.is_some();

    match body.time_scope_type.as_deref() {
        Some("FIXED") => {
            if has_relative {
                return Err(ValidationFailure::new(
                    "FIXED time scope cannot be combined with lastN/timeUnit",
                ));
            }
            let (Some(start), Some(end)) = (&body.time_start, &body.time_end) else {
                return Err(ValidationFailure::new(
                    "FIXED time scope requires both timeStart and timeEnd",
                ));
            };
            let start = parse_date(start, "timeStart")?;
            let end = parse_date(end, "timeEnd")?;
            if start > end {
                return Err(ValidationFailure::new("timeStart must not be after timeEnd"));
            }
            Ok(TimeScope::Fixed { start, end })
        }
        Some("RELATIVE") => {
            if has_absolute {
                return Err(ValidationFailure::new(
                    "RELATIVE time scope cannot be combined with timeStart/timeEnd",
                ));
            }
            let (Some(last_n), Some(unit)) = (body.last_n, body.time_unit.as_deref()) else {
                return Err(ValidationFailure::new(
                    "RELATIVE time scope requires both lastN and timeUnit",
                ));
            };
            let last_n = u32::try_from(last_n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ValidationFailure::new("lastN must be a positive integer"))?;
            let unit = TimeUnit::parse(unit)
                .ok_or_else(|| ValidationFailure::new(format!("Unsupported timeUnit: {}", unit)))?;
            Ok(TimeScope::Relative { last_n, unit })
        }
        Some(other) => Err(ValidationFailure::new(format!(
            "Unsupported timeScopeType: {}",
            other
        ))),
        None => Err(ValidationFailure::new("timeScopeType is required")),
    }
}

fn parse_target(body: &AttributionRequestBody) -> Result<DashboardTarget, ValidationFailure> {
    let dashboard_id = body.dashboard_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let sheet_id = body.sheet_id.as_deref().map(str::trim).filter(|s| !s.is_empty());

    match (dashboard_id, sheet_id) {
        (Some(dashboard_id), Some(sheet_id)) => Ok(DashboardTarget::Existing {
            dashboard_id: dashboard_id.to_string(),
            sheet_id: sheet_id.to_string(),
        }),
        (Some(_), None) => Err(ValidationFailure::new(
            "sheetId is required when dashboardId is provided",
        )),
        (None, _) => Ok(DashboardTarget::Fresh),
    }
}

fn parse_window(body: &AttributionRequestBody) -> Result<AttributionWindow, ValidationFailure> {
    let Some(window) = &body.attribution_window else {
        return Ok(AttributionWindow::None);
    };
    match window.window_type.as_deref() {
        None | Some("NONE") => Ok(AttributionWindow::None),
        Some("SESSION") => Ok(AttributionWindow::Session),
        Some("CUSTOMIZE") => {
            let seconds = window
                .seconds
                .and_then(|s| u32::try_from(s).ok())
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    ValidationFailure::new("CUSTOMIZE attribution window requires positive seconds")
                })?;
            Ok(AttributionWindow::Customize { seconds })
        }
        Some(other) => Err(ValidationFailure::new(format!(
            "Unsupported attributionWindow type: {}",
            other
        ))),
    }
}

fn parse_position_weights(
    body: &AttributionRequestBody,
    model_type: ModelType,
) -> Result<PositionWeights, ValidationFailure> {
    let Some(weights) = &body.position_weights else {
        return Ok(PositionWeights::default());
    };
    if model_type != ModelType::Position {
        return Err(ValidationFailure::new(
            "positionWeights is only supported by the POSITION model",
        ));
    }
    let defaults = PositionWeights::default();
    let parsed = PositionWeights {
        first: weights.first.unwrap_or(defaults.first),
        last: weights.last.unwrap_or(defaults.last),
    };
    let in_range = |w: f64| w.is_finite() && (0.0..=1.0).contains(&w);
    if !in_range(parsed.first) || !in_range(parsed.last) {
        return Err(ValidationFailure::new("positionWeights must be between 0 and 1"));
    }
    if parsed.first + parsed.last > 1.0 + 1e-9 {
        return Err(ValidationFailure::new("positionWeights first + last must not exceed 1"));
    }
    if parsed.first + parsed.last <= 0.0 {
        return Err(ValidationFailure::new("positionWeights first + last must be positive"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AttributionWindowBody;

    fn valid_body() -> AttributionRequestBody {
        AttributionRequestBody {
            project_id: Some("p1".to_string()),
            app_id: Some("a1".to_string()),
            model_type: Some("LAST_TOUCH".to_string()),
            touch_point_event_name: Some("view_item".to_string()),
            conversion_event_name: Some("purchase".to_string()),
            time_scope_type: Some("FIXED".to_string()),
            time_start: Some("2024-01-01".to_string()),
            time_end: Some("2024-01-31".to_string()),
            view_name: Some("attribution_view".to_string()),
            action: Some("PREVIEW".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request() {
        assert_eq!(validate(&valid_body()), ValidationResult::ok());
        let request = parse(&valid_body()).unwrap();
        assert_eq!(request.model_type, ModelType::LastTouch);
        assert_eq!(request.target, DashboardTarget::Fresh);
        assert_eq!(request.locale, Locale::EnUs);
    }

    #[test]
    fn test_unknown_model_type_rejected() {
        let mut body = valid_body();
        body.model_type = Some("UNKNOWN".to_string());
        let result = validate(&body);
        assert!(!result.valid);
        assert!(result.message.unwrap().contains("UNKNOWN"));
    }

    #[test]
    fn test_dashboard_without_sheet_rejected() {
        let mut body = valid_body();
        body.dashboard_id = Some("dash-1".to_string());
        let result = validate(&body);
        assert!(!result.valid);
        assert!(result.message.unwrap().contains("sheetId"));

        body.sheet_id = Some("sheet-1".to_string());
        let request = parse(&body).unwrap();
        assert_eq!(
            request.target,
            DashboardTarget::Existing {
                dashboard_id: "dash-1".to_string(),
                sheet_id: "sheet-1".to_string()
            }
        );
    }

    #[test]
    fn test_mixed_time_scope_rejected() {
        let mut body = valid_body();
        body.last_n = Some(7);
        assert!(!validate(&body).valid);

        let mut body = valid_body();
        body.time_scope_type = Some("RELATIVE".to_string());
        body.last_n = Some(7);
        body.time_unit = Some("DAY".to_string());
        assert!(!validate(&body).valid);

        body.time_start = None;
        body.time_end = None;
        let request = parse(&body).unwrap();
        assert_eq!(request.time_scope, TimeScope::Relative { last_n: 7, unit: TimeUnit::Day });
    }

    #[test]
    fn test_missing_time_scope_rejected() {
        let mut body = valid_body();
        body.time_scope_type = None;
        assert!(!validate(&body).valid);

        let mut body = valid_body();
        body.time_end = None;
        assert!(!validate(&body).valid);
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let mut body = valid_body();
        body.time_start = Some("2024-02-01".to_string());
        assert!(!validate(&body).valid);
    }

    #[test]
    fn test_required_identifiers() {
        let mut body = valid_body();
        body.project_id = Some("  ".to_string());
        assert!(!validate(&body).valid);

        let mut body = valid_body();
        body.app_id = Some("app;drop".to_string());
        assert!(!validate(&body).valid);

        let mut body = valid_body();
        body.touch_point_event_name = None;
        assert!(!validate(&body).valid);
    }

    #[test]
    fn test_conversion_cannot_be_touch_point() {
        let mut body = valid_body();
        body.additional_touch_point_event_names = vec!["purchase".to_string()];
        assert!(!validate(&body).valid);
    }

    #[test]
    fn test_additional_touch_points_are_deduplicated() {
        let mut body = valid_body();
        body.additional_touch_point_event_names =
            vec!["add_to_cart".to_string(), "view_item".to_string()];
        let request = parse(&body).unwrap();
        assert_eq!(request.touch_point_event_names, vec!["view_item", "add_to_cart"]);
    }

    #[test]
    fn test_window_and_weights() {
        let mut body = valid_body();
        body.attribution_window = Some(AttributionWindowBody {
            window_type: Some("CUSTOMIZE".to_string()),
            seconds: Some(0),
        });
        assert!(!validate(&body).valid);

        let mut body = valid_body();
        body.position_weights = Some(crate::request::PositionWeightsBody {
            first: Some(0.3),
            last: Some(0.3),
        });
        // weights only make sense for POSITION
        assert!(!validate(&body).valid);
        body.model_type = Some("POSITION".to_string());
        let request = parse(&body).unwrap();
        assert!((request.position_weights.middle() - 0.4).abs() < 1e-9);
    }
}
