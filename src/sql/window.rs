//! Time-scope and attribution-window predicates
//!
//! Day boundaries are evaluated in the app's local time, so the filter wraps
//! the UTC event timestamp with the timezone conversion before comparing.

use super::template::{placeholder, PARAM_DATE_END, PARAM_DATE_START, PARAM_LAST_N, PARAM_TIME_UNIT};
use crate::request::{AttributionWindow, TimeScope};
use crate::timezone::AppTimezone;

/// Predicate restricting `timestamp_col` to the requested time scope. The
/// bounds are dashboard parameter placeholders, see `template`.
pub fn time_scope_condition(scope: &TimeScope, timezone: &AppTimezone, timestamp_col: &str) -> String {
    let local_ts = timezone.local_time_sql(timestamp_col);
    match scope {
        TimeScope::Fixed { .. } => format!(
            "CAST({local} AS DATE) >= CAST('{start}' AS DATE) AND CAST({local} AS DATE) <= CAST('{end}' AS DATE)",
            local = local_ts,
            start = placeholder(PARAM_DATE_START),
            end = placeholder(PARAM_DATE_END),
        ),
        TimeScope::Relative { .. } => {
            let local_now = timezone.local_time_sql("GETDATE()");
            format!(
                "{local} >= DATE_TRUNC('day', DATEADD({unit}, -{n}, {now}))",
                local = local_ts,
                unit = placeholder(PARAM_TIME_UNIT),
                n = placeholder(PARAM_LAST_N),
                now = local_now,
            )
        }
    }
}

/// Extra join predicate limiting how far back a touch may be credited.
pub fn window_condition(
    window: &AttributionWindow,
    touch_alias: &str,
    conversion_alias: &str,
) -> Option<String> {
    match window {
        AttributionWindow::None => None,
        AttributionWindow::Session => Some(format!(
            "{t}.session_id = {c}.conversion_session_id",
            t = touch_alias,
            c = conversion_alias
        )),
        AttributionWindow::Customize { seconds } => Some(format!(
            "{t}.touch_timestamp >= DATEADD(SECOND, -{s}, {c}.conversion_timestamp)",
            t = touch_alias,
            c = conversion_alias,
            s = seconds
        )),
    }
}
