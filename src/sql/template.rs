//! Dashboard parameter placeholders
//!
//! The time scope is not baked into the statement. The builder writes
//! `<<$name>>` placeholders that the visualization provider replaces with the
//! current value of the dashboard parameter `name`, so filter controls bound to
//! those parameters re-filter the dataset without new SQL. `render` fills in
//! the request's own values for syntax checks and the CLI.

use crate::request::TimeScope;

pub const PARAM_DATE_START: &str = "dateStart";
pub const PARAM_DATE_END: &str = "dateEnd";
pub const PARAM_LAST_N: &str = "lastN";
pub const PARAM_TIME_UNIT: &str = "timeUnit";

/// Placeholder text for a dashboard parameter
pub fn placeholder(name: &str) -> String {
    format!("<<${}>>", name)
}

/// Parameters a time scope binds, with the request's values as defaults.
/// Values are substituted verbatim, so each one is already valid SQL text in
/// its position (dates sit inside quotes, the unit is a `DATEADD` date part).
pub fn parameter_defaults(scope: &TimeScope) -> Vec<(&'static str, String)> {
    match scope {
        TimeScope::Fixed { start, end } => vec![
            (PARAM_DATE_START, start.format("%Y-%m-%d").to_string()),
            (PARAM_DATE_END, end.format("%Y-%m-%d").to_string()),
        ],
        TimeScope::Relative { last_n, unit } => vec![
            (PARAM_LAST_N, last_n.to_string()),
            (PARAM_TIME_UNIT, unit.as_sql().to_string()),
        ],
    }
}

/// Replace every placeholder of `scope` with its default value.
pub fn render(template: &str, scope: &TimeScope) -> String {
    parameter_defaults(scope)
        .into_iter()
        .fold(template.to_string(), |sql, (name, value)| {
            sql.replace(&placeholder(name), &value)
        })
}
