//! In-memory attribution
//!
//! Evaluates an attribution request over a list of events with the same
//! semantics as the generated SQL: time scope in local time, touches attached
//! to the first conversion after them, ties broken by event id, credit split
//! by the model's strategy. Used for dry runs from the CLI.

use crate::request::{AttributionRequest, AttributionWindow, ComputeMethod, TimeScope, TimeUnit};
use crate::sql::CreditStrategy;
use crate::timezone::AppTimezone;
use chrono::{DateTime, Duration, Months, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One row of the clickstream event table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickstreamEvent {
    pub event_id: String,
    pub event_name: String,
    pub user_pseudo_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub event_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub event_value: Option<f64>,
}

/// One output row, mirroring the SQL result columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchPointSummary {
    pub touch_point_name: String,
    pub trigger_count: u64,
    pub total_conversion: f64,
    pub triggers_with_conversion: u64,
    pub contribution: f64,
    pub contribution_rate: f64,
}

#[derive(Default)]
struct Accumulator {
    trigger_count: u64,
    triggers_with_conversion: u64,
    contribution: f64,
}

fn in_scope(scope: &TimeScope, local: NaiveDateTime, local_now: NaiveDateTime) -> bool {
    match scope {
        TimeScope::Fixed { start, end } => {
            let day = local.date();
            day >= *start && day <= *end
        }
        TimeScope::Relative { last_n, unit } => {
            let shifted = match unit {
                TimeUnit::Day => Some(local_now - Duration::days(i64::from(*last_n))),
                TimeUnit::Week => Some(local_now - Duration::weeks(i64::from(*last_n))),
                TimeUnit::Month => local_now.checked_sub_months(Months::new(*last_n)),
                TimeUnit::Year => local_now.checked_sub_months(Months::new(last_n.saturating_mul(12))),
            };
            match shifted {
                Some(shifted) => local >= shifted.date().and_time(chrono::NaiveTime::MIN),
                None => true,
            }
        }
    }
}

fn within_window(window: &AttributionWindow, touch: &ClickstreamEvent, conversion: &ClickstreamEvent) -> bool {
    match window {
        AttributionWindow::None => true,
        AttributionWindow::Session => match (&touch.session_id, &conversion.session_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        AttributionWindow::Customize { seconds } => {
            touch.event_timestamp >= conversion.event_timestamp - Duration::seconds(i64::from(*seconds))
        }
    }
}

/// Attribute conversions in `events` to the request's touch points.
pub fn attribute(
    events: &[ClickstreamEvent],
    request: &AttributionRequest,
    timezone: AppTimezone,
    now: DateTime<Utc>,
) -> Vec<TouchPointSummary> {
    let strategy = CreditStrategy::for_model(request.model_type, request.position_weights);
    let local_now = timezone.to_local(now);

    let is_touch = |name: &str| request.touch_point_event_names.iter().any(|t| t == name);
    let is_conversion = |name: &str| name == request.conversion_event_name;

    let mut per_user: BTreeMap<&str, (Vec<&ClickstreamEvent>, Vec<&ClickstreamEvent>)> = BTreeMap::new();
    for event in events {
        if !(is_touch(&event.event_name) || is_conversion(&event.event_name)) {
            continue;
        }
        if !in_scope(&request.time_scope, timezone.to_local(event.event_timestamp), local_now) {
            continue;
        }
        let entry = per_user.entry(event.user_pseudo_id.as_str()).or_default();
        if is_conversion(&event.event_name) {
            entry.1.push(event);
        } else {
            entry.0.push(event);
        }
    }

    let weight_of = |conversion: &ClickstreamEvent| match request.compute_method {
        ComputeMethod::EventCount => 1.0,
        ComputeMethod::SumValue => conversion.event_value.unwrap_or(0.0),
    };

    let mut totals: HashMap<String, Accumulator> = HashMap::new();
    let mut total_conversion = 0.0;

    for (touches, conversions) in per_user.values_mut() {
        touches.sort_by(|a, b| (a.event_timestamp, &a.event_id).cmp(&(b.event_timestamp, &b.event_id)));
        conversions.sort_by(|a, b| (a.event_timestamp, &a.event_id).cmp(&(b.event_timestamp, &b.event_id)));

        for touch in touches.iter() {
            totals.entry(touch.event_name.clone()).or_default().trigger_count += 1;
        }

        let mut previous: Option<DateTime<Utc>> = None;
        for conversion in conversions.iter() {
            total_conversion += weight_of(*conversion);

            let attributed: Vec<&&ClickstreamEvent> = touches
                .iter()
                .filter(|t| t.event_timestamp < conversion.event_timestamp)
                .filter(|t| previous.map_or(true, |p| t.event_timestamp >= p))
                .filter(|t| within_window(&request.attribution_window, t, conversion))
                .collect();

            let credits = strategy.credits(attributed.len());
            let weight = weight_of(*conversion);
            for (touch, credit) in attributed.iter().zip(credits) {
                let acc = totals.entry(touch.event_name.clone()).or_default();
                if credit > 0.0 {
                    acc.triggers_with_conversion += 1;
                }
                acc.contribution += credit * weight;
            }
            previous = Some(conversion.event_timestamp);
        }
    }

    let mut summaries: Vec<TouchPointSummary> = totals
        .into_iter()
        .map(|(name, acc)| TouchPointSummary {
            touch_point_name: name,
            trigger_count: acc.trigger_count,
            total_conversion,
            triggers_with_conversion: acc.triggers_with_conversion,
            contribution: acc.contribution,
            contribution_rate: if total_conversion == 0.0 {
                0.0
            } else {
                acc.contribution / total_conversion
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.contribution
            .total_cmp(&a.contribution)
            .then_with(|| a.touch_point_name.cmp(&b.touch_point_name))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{
        Action, ChartType, DashboardTarget, Locale, ModelType, PositionWeights,
    };
    use chrono::{NaiveDate, TimeZone};

    const EPS: f64 = 1e-9;

    fn request(model_type: ModelType, touches: &[&str]) -> AttributionRequest {
        AttributionRequest {
            project_id: "p1".to_string(),
            app_id: "a1".to_string(),
            model_type,
            touch_point_event_names: touches.iter().map(|s| s.to_string()).collect(),
            conversion_event_name: "purchase".to_string(),
            time_scope: TimeScope::Fixed {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            },
            target: DashboardTarget::Fresh,
            locale: Locale::EnUs,
            chart_type: ChartType::Table,
            view_name: "v".to_string(),
            action: Action::Preview,
            compute_method: ComputeMethod::EventCount,
            attribution_window: AttributionWindow::None,
            position_weights: PositionWeights::default(),
        }
    }

    fn event(id: &str, name: &str, user: &str, minute: u32) -> ClickstreamEvent {
        ClickstreamEvent {
            event_id: id.to_string(),
            event_name: name.to_string(),
            user_pseudo_id: user.to_string(),
            session_id: Some(format!("{}-s1", user)),
            event_timestamp: Utc.with_ymd_and_hms(2024, 1, 10, 12, minute, 0).unwrap(),
            event_value: Some(10.0),
        }
    }

    /// u1: banner, search, email, purchase; u2: search, purchase, banner, purchase;
    /// u3: banner only (no conversion); u4: purchase with no touch
    fn journey() -> Vec<ClickstreamEvent> {
        vec![
            event("e01", "banner", "u1", 1),
            event("e02", "search", "u1", 2),
            event("e03", "email", "u1", 3),
            event("e04", "purchase", "u1", 4),
            event("e05", "search", "u2", 1),
            event("e06", "purchase", "u2", 2),
            event("e07", "banner", "u2", 3),
            event("e08", "purchase", "u2", 4),
            event("e09", "banner", "u3", 1),
            event("e10", "purchase", "u4", 1),
        ]
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    fn by_name(rows: &[TouchPointSummary], name: &str) -> TouchPointSummary {
        rows.iter().find(|r| r.touch_point_name == name).cloned().unwrap()
    }

    #[test]
    fn test_single_point_credit_sums_to_converting_conversions() {
        for model in [ModelType::FirstTouch, ModelType::LastTouch] {
            let rows = attribute(&journey(), &request(model, &["banner", "search", "email"]), AppTimezone::utc(), now());
            let total: f64 = rows.iter().map(|r| r.contribution).sum();
            // u1 purchase, u2 both purchases have touches; u4's purchase has none
            assert!((total - 3.0).abs() < EPS);
            assert!((rows[0].total_conversion - 4.0).abs() < EPS);
        }
    }

    #[test]
    fn test_first_and_last_touch_selection() {
        let touches = ["banner", "search", "email"];
        let first = attribute(&journey(), &request(ModelType::FirstTouch, &touches), AppTimezone::utc(), now());
        assert!((by_name(&first, "banner").contribution - 2.0).abs() < EPS);
        assert!((by_name(&first, "search").contribution - 1.0).abs() < EPS);
        assert!((by_name(&first, "email").contribution).abs() < EPS);

        let last = attribute(&journey(), &request(ModelType::LastTouch, &touches), AppTimezone::utc(), now());
        assert!((by_name(&last, "email").contribution - 1.0).abs() < EPS);
        assert!((by_name(&last, "search").contribution - 1.0).abs() < EPS);
        assert!((by_name(&last, "banner").contribution - 1.0).abs() < EPS);
        assert_eq!(by_name(&last, "banner").trigger_count, 3);
        assert_eq!(by_name(&last, "banner").triggers_with_conversion, 1);
    }

    #[test]
    fn test_linear_credit() {
        let rows = attribute(&journey(), &request(ModelType::Linear, &["banner", "search", "email"]), AppTimezone::utc(), now());
        // u1 splits 1/3 each; u2 gives search 1 and banner 1
        assert!((by_name(&rows, "email").contribution - 1.0 / 3.0).abs() < EPS);
        assert!((by_name(&rows, "search").contribution - (1.0 + 1.0 / 3.0)).abs() < EPS);
        assert!((by_name(&rows, "banner").contribution - (1.0 + 1.0 / 3.0)).abs() < EPS);
        let total: f64 = rows.iter().map(|r| r.contribution).sum();
        assert!((total - 3.0).abs() < EPS);
        assert!((by_name(&rows, "banner").contribution_rate - (4.0 / 3.0) / 4.0).abs() < EPS);
    }

    #[test]
    fn test_position_credit() {
        let rows = attribute(&journey(), &request(ModelType::Position, &["banner", "search", "email"]), AppTimezone::utc(), now());
        // u1: banner 0.4, search 0.2, email 0.4
        assert!((by_name(&rows, "email").contribution - 0.4).abs() < EPS);
        assert!((by_name(&rows, "search").contribution - 1.2).abs() < EPS);
        assert!((by_name(&rows, "banner").contribution - 1.4).abs() < EPS);
    }

    #[test]
    fn test_tie_break_by_event_id_is_deterministic() {
        let mut events = vec![
            event("b", "search", "u1", 1),
            event("a", "banner", "u1", 1),
            event("c", "purchase", "u1", 2),
        ];
        let req = request(ModelType::FirstTouch, &["banner", "search"]);
        let first_run = attribute(&events, &req, AppTimezone::utc(), now());
        events.reverse();
        let second_run = attribute(&events, &req, AppTimezone::utc(), now());
        assert_eq!(first_run, second_run);
        assert!((by_name(&first_run, "banner").contribution - 1.0).abs() < EPS);
    }

    #[test]
    fn test_timezone_shifts_day_boundary() {
        let mut late = event("e1", "banner", "u1", 0);
        late.event_timestamp = Utc.with_ymd_and_hms(2024, 1, 31, 20, 0, 0).unwrap();
        let mut conversion = event("e2", "purchase", "u1", 0);
        conversion.event_timestamp = Utc.with_ymd_and_hms(2024, 1, 31, 21, 0, 0).unwrap();
        let events = vec![late, conversion];
        let req = request(ModelType::LastTouch, &["banner"]);

        let utc_rows = attribute(&events, &req, AppTimezone::utc(), now());
        assert_eq!(utc_rows.len(), 1);
        // at +08:00 both events fall on 2024-02-01, outside the range
        let shifted = attribute(&events, &req, AppTimezone::Offset(480), now());
        assert!(shifted.is_empty());
    }

    #[test]
    fn test_sum_value_and_windows() {
        let mut req = request(ModelType::LastTouch, &["banner", "search", "email"]);
        req.compute_method = ComputeMethod::SumValue;
        let rows = attribute(&journey(), &req, AppTimezone::utc(), now());
        assert!((rows[0].total_conversion - 40.0).abs() < EPS);
        assert!((by_name(&rows, "email").contribution - 10.0).abs() < EPS);

        let mut req = request(ModelType::Linear, &["banner", "search", "email"]);
        req.attribution_window = AttributionWindow::Customize { seconds: 90 };
        let rows = attribute(&journey(), &req, AppTimezone::utc(), now());
        // only the touch one minute before each purchase qualifies
        assert!((by_name(&rows, "email").contribution - 1.0).abs() < EPS);
        assert!((by_name(&rows, "banner").contribution - 1.0).abs() < EPS);
        assert!((by_name(&rows, "search").contribution - 1.0).abs() < EPS);
    }

    #[test]
    fn test_touch_at_conversion_time_is_not_credited() {
        let events = vec![
            event("e1", "search", "u1", 1),
            event("e2", "banner", "u1", 4),
            event("e3", "purchase", "u1", 4),
        ];
        let rows = attribute(&events, &request(ModelType::LastTouch, &["banner", "search"]), AppTimezone::utc(), now());
        assert!((by_name(&rows, "search").contribution - 1.0).abs() < EPS);
        assert!(by_name(&rows, "banner").contribution.abs() < EPS);
        assert_eq!(by_name(&rows, "banner").triggers_with_conversion, 0);
    }

    #[test]
    fn test_touch_at_previous_conversion_time_goes_to_next_conversion() {
        let events = vec![
            event("e1", "search", "u1", 1),
            event("e2", "purchase", "u1", 2),
            event("e3", "banner", "u1", 2),
            event("e4", "purchase", "u1", 5),
        ];
        let rows = attribute(&events, &request(ModelType::FirstTouch, &["banner", "search"]), AppTimezone::utc(), now());
        assert!((by_name(&rows, "search").contribution - 1.0).abs() < EPS);
        assert!((by_name(&rows, "banner").contribution - 1.0).abs() < EPS);
        assert!((rows[0].total_conversion - 2.0).abs() < EPS);
    }
}
