//! Credit assignment strategies
//!
//! A strategy decides how one conversion's credit is split over the ordered
//! touches that precede it. `credits` is the reference distribution;
//! `credit_sql` emits the same rule as a SQL expression over the rank/count
//! columns of the shared skeleton.

use crate::request::{ModelType, PositionWeights};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchDirection {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CreditStrategy {
    SinglePoint { direction: TouchDirection },
    Linear,
    Position { weights: PositionWeights },
}

impl CreditStrategy {
    pub fn for_model(model_type: ModelType, weights: PositionWeights) -> Self {
        match model_type {
            ModelType::FirstTouch => CreditStrategy::SinglePoint { direction: TouchDirection::First },
            ModelType::LastTouch => CreditStrategy::SinglePoint { direction: TouchDirection::Last },
            ModelType::Linear => CreditStrategy::Linear,
            ModelType::Position => CreditStrategy::Position { weights },
        }
    }

    /// Credit of each of `touch_count` touches, in chronological order.
    pub fn credits(&self, touch_count: usize) -> Vec<f64> {
        if touch_count == 0 {
            return Vec::new();
        }
        let n = touch_count;
        match self {
            CreditStrategy::SinglePoint { direction } => {
                let chosen = match direction {
                    TouchDirection::First => 0,
                    TouchDirection::Last => n - 1,
                };
                (0..n).map(|i| if i == chosen { 1.0 } else { 0.0 }).collect()
            }
            CreditStrategy::Linear => vec![1.0 / n as f64; n],
            CreditStrategy::Position { weights } => match n {
                1 => vec![1.0],
                2 => {
                    let ends = weights.first + weights.last;
                    vec![weights.first / ends, weights.last / ends]
                }
                _ => {
                    let middle = weights.middle() / (n - 2) as f64;
                    (0..n)
                        .map(|i| {
                            if i == 0 {
                                weights.first
                            } else if i == n - 1 {
                                weights.last
                            } else {
                                middle
                            }
                        })
                        .collect()
                }
            },
        }
    }

    /// SQL expression for the credit of one ranked touch (1-based `rank_col`).
    pub fn credit_sql(&self, rank_col: &str, count_col: &str) -> String {
        let expr = match self {
            CreditStrategy::SinglePoint { direction: TouchDirection::First } => {
                format!("CASE WHEN {} = 1 THEN 1.0 ELSE 0.0 END", rank_col)
            }
            CreditStrategy::SinglePoint { direction: TouchDirection::Last } => {
                format!("CASE WHEN {} = {} THEN 1.0 ELSE 0.0 END", rank_col, count_col)
            }
            CreditStrategy::Linear => format!("1.0 / CAST({} AS DOUBLE PRECISION)", count_col),
            CreditStrategy::Position { weights } => {
                let ends = weights.first + weights.last;
                format!(
                    "CASE WHEN {count} = 1 THEN 1.0 \
                     WHEN {count} = 2 AND {rank} = 1 THEN {first_of_two} \
                     WHEN {count} = 2 THEN {last_of_two} \
                     WHEN {rank} = 1 THEN {first} \
                     WHEN {rank} = {count} THEN {last} \
                     ELSE {middle} / CAST({count} - 2 AS DOUBLE PRECISION) END",
                    count = count_col,
                    rank = rank_col,
                    first_of_two = sql_number(weights.first / ends),
                    last_of_two = sql_number(weights.last / ends),
                    first = sql_number(weights.first),
                    last = sql_number(weights.last),
                    middle = sql_number(weights.middle()),
                )
            }
        };
        format!("CAST({} AS DOUBLE PRECISION)", expr)
    }
}

/// Render a weight as the shortest SQL numeric literal that reads back as the same `f64`.
pub(crate) fn sql_number(value: f64) -> String {
    let rendered = format!("{}", value);
    if rendered.contains('.') {
        rendered
    } else {
        format!("{}.0", rendered)
    }
}
