//! Attribution SQL skeleton
//!
//! All models share the same CTE chain: filter events, split touches from
//! conversions, attach each touch to the first conversion after it, rank the
//! touches per conversion, then credit and aggregate. Only the credit
//! expression differs between models.

use super::strategy::CreditStrategy;
use super::window::{time_scope_condition, window_condition};
use super::{AttributionSqlParameters, EVENT_TABLE};
use crate::request::ComputeMethod;
use itertools::Itertools;
use tracing::debug;

pub struct AttributionSqlBuilder<'a> {
    params: &'a AttributionSqlParameters,
    strategy: CreditStrategy,
}

impl<'a> AttributionSqlBuilder<'a> {
    pub fn new(params: &'a AttributionSqlParameters, strategy: CreditStrategy) -> Self {
        Self { params, strategy }
    }

    pub fn build(&self) -> String {
        let ctes = [
            ("base_data", self.base_data()),
            ("touch_data", self.touch_data()),
            ("conversion_data", self.conversion_data()),
            ("attributed_touch", self.attributed_touch()),
            ("ranked_touch", self.ranked_touch()),
            ("credited_touch", self.credited_touch()),
            ("touch_totals", self.touch_totals()),
            ("conversion_totals", self.conversion_totals()),
            ("contribution_totals", self.contribution_totals()),
        ];

        let with_clause = ctes
            .iter()
            .map(|(name, body)| format!("{} AS (\n{}\n)", name, body))
            .join(",\n");

        let sql = format!("WITH {}\n{}", with_clause, self.final_select());
        debug!("Built attribution SQL with strategy {:?}", self.strategy);
        sql
    }

    /// `event_name = 'a' OR event_name = 'b'` over the given column
    fn name_match(column: &str, names: &[String]) -> String {
        let parts: Vec<String> = names.iter().map(|n| format!("{} = {}", column, n)).collect();
        if parts.len() == 1 {
            parts[0].clone()
        } else {
            format!("({})", parts.join(" OR "))
        }
    }

    fn touch_names(&self) -> Vec<String> {
        self.params
            .touch_point_names
            .iter()
            .map(|lit| lit.to_string())
            .collect()
    }

    fn base_data(&self) -> String {
        let mut names = self.touch_names();
        names.push(self.params.conversion_event_name.to_string());

        let conditions = [
            Self::name_match("e.event_name", &names),
            time_scope_condition(&self.params.time_scope, &self.params.timezone, "e.event_timestamp"),
        ];

        format!(
            "  SELECT e.event_id, e.event_name, e.user_pseudo_id, e.session_id, e.event_timestamp, \
             COALESCE(e.event_value, 0) AS event_value\n  \
             FROM {schema}.{table} AS e\n  \
             WHERE {where_clause}",
            schema = self.params.schema_name,
            table = EVENT_TABLE,
            where_clause = conditions.join("\n    AND "),
        )
    }

    fn touch_data(&self) -> String {
        format!(
            "  SELECT b.event_id AS touch_id, b.event_name AS touch_point_name, b.user_pseudo_id, \
             b.session_id, b.event_timestamp AS touch_timestamp\n  \
             FROM base_data AS b\n  \
             WHERE {}",
            Self::name_match("b.event_name", &self.touch_names())
        )
    }

    fn conversion_data(&self) -> String {
        format!(
            "  SELECT b.event_id AS conversion_id, b.user_pseudo_id, b.session_id AS conversion_session_id, \
             b.event_timestamp AS conversion_timestamp, b.event_value AS conversion_value, \
             LAG(b.event_timestamp) OVER (PARTITION BY b.user_pseudo_id ORDER BY b.event_timestamp ASC, b.event_id ASC) \
             AS previous_conversion_timestamp\n  \
             FROM base_data AS b\n  \
             WHERE b.event_name = {}",
            self.params.conversion_event_name
        )
    }

    /// Each touch belongs to the first conversion after it: strictly before
    /// the conversion and not before the user's previous conversion.
    fn attributed_touch(&self) -> String {
        let mut join_conditions = vec![
            "t.user_pseudo_id = c.user_pseudo_id".to_string(),
            "t.touch_timestamp < c.conversion_timestamp".to_string(),
            "(c.previous_conversion_timestamp IS NULL OR t.touch_timestamp >= c.previous_conversion_timestamp)"
                .to_string(),
        ];
        if let Some(window) = window_condition(&self.params.attribution_window, "t", "c") {
            join_conditions.push(window);
        }

        format!(
            "  SELECT t.touch_id, t.touch_point_name, t.touch_timestamp, c.conversion_id, c.conversion_value\n  \
             FROM touch_data AS t\n  \
             JOIN conversion_data AS c\n    \
             ON {}",
            join_conditions.join("\n    AND ")
        )
    }

    /// Ties on timestamp are broken by event id so ranking is reproducible.
    fn ranked_touch(&self) -> String {
        "  SELECT a.touch_id, a.touch_point_name, a.conversion_id, a.conversion_value, \
         ROW_NUMBER() OVER (PARTITION BY a.conversion_id ORDER BY a.touch_timestamp ASC, a.touch_id ASC) AS touch_rank, \
         COUNT(*) OVER (PARTITION BY a.conversion_id) AS touch_count\n  \
         FROM attributed_touch AS a"
            .to_string()
    }

    fn credited_touch(&self) -> String {
        let weight = match self.params.compute_method {
            ComputeMethod::EventCount => "CAST(1 AS DOUBLE PRECISION)",
            ComputeMethod::SumValue => "CAST(r.conversion_value AS DOUBLE PRECISION)",
        };
        format!(
            "  SELECT r.touch_id, r.touch_point_name, r.conversion_id, {} AS conversion_weight, {} AS credit\n  \
             FROM ranked_touch AS r",
            weight,
            self.strategy.credit_sql("r.touch_rank", "r.touch_count")
        )
    }

    fn touch_totals(&self) -> String {
        "  SELECT touch_point_name, COUNT(*) AS trigger_count\n  \
         FROM touch_data\n  \
         GROUP BY touch_point_name"
            .to_string()
    }

    fn conversion_totals(&self) -> String {
        let total = match self.params.compute_method {
            ComputeMethod::EventCount => "CAST(COUNT(*) AS DOUBLE PRECISION)",
            ComputeMethod::SumValue => "CAST(COALESCE(SUM(conversion_value), 0) AS DOUBLE PRECISION)",
        };
        format!("  SELECT {} AS total_conversion\n  FROM conversion_data", total)
    }

    fn contribution_totals(&self) -> String {
        "  SELECT touch_point_name, \
         COUNT(CASE WHEN credit > 0 THEN touch_id END) AS triggers_with_conversion, \
         SUM(credit * conversion_weight) AS contribution\n  \
         FROM credited_touch\n  \
         GROUP BY touch_point_name"
            .to_string()
    }

    fn final_select(&self) -> String {
        "SELECT tt.touch_point_name, tt.trigger_count, ct.total_conversion, \
         COALESCE(cb.triggers_with_conversion, 0) AS triggers_with_conversion, \
         COALESCE(cb.contribution, 0) AS contribution, \
         CASE WHEN ct.total_conversion = 0 THEN CAST(0 AS DOUBLE PRECISION) \
         ELSE COALESCE(cb.contribution, 0) / ct.total_conversion END AS contribution_rate\n\
         FROM touch_totals AS tt\n\
         CROSS JOIN conversion_totals AS ct\n\
         LEFT JOIN contribution_totals AS cb ON tt.touch_point_name = cb.touch_point_name\n\
         ORDER BY contribution DESC, tt.touch_point_name ASC"
            .to_string()
    }
}
