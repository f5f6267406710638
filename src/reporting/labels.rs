//! Locale-aware titles and column labels for attribution visuals

use crate::request::{ComputeMethod, Locale, ModelType};
use crate::sql::RESULT_COLUMNS;

pub fn visual_title(locale: Locale, model_type: ModelType) -> String {
    let model = model_label(locale, model_type);
    match locale {
        Locale::EnUs => format!("Attribution Analysis ({})", model),
        Locale::ZhCn => format!("归因分析（{}）", model),
    }
}

pub fn model_label(locale: Locale, model_type: ModelType) -> &'static str {
    match (locale, model_type) {
        (Locale::EnUs, ModelType::FirstTouch) => "First Touch",
        (Locale::EnUs, ModelType::LastTouch) => "Last Touch",
        (Locale::EnUs, ModelType::Linear) => "Linear",
        (Locale::EnUs, ModelType::Position) => "Position Based",
        (Locale::ZhCn, ModelType::FirstTouch) => "首次触点",
        (Locale::ZhCn, ModelType::LastTouch) => "末次触点",
        (Locale::ZhCn, ModelType::Linear) => "线性",
        (Locale::ZhCn, ModelType::Position) => "位置",
    }
}

/// Label for one result column; value-based contribution gets its own wording.
pub fn column_label(locale: Locale, column: &str, compute_method: ComputeMethod) -> String {
    let value_based = compute_method == ComputeMethod::SumValue;
    let label = match (locale, column) {
        (Locale::EnUs, "touch_point_name") => "Touch Point Name",
        (Locale::EnUs, "trigger_count") => "Trigger Count",
        (Locale::EnUs, "total_conversion") if value_based => "Total Conversion Value",
        (Locale::EnUs, "total_conversion") => "Total Conversion",
        (Locale::EnUs, "triggers_with_conversion") => "Triggers With Conversion",
        (Locale::EnUs, "contribution") if value_based => "Contribution (Value)",
        (Locale::EnUs, "contribution") => "Contribution",
        (Locale::EnUs, "contribution_rate") => "Contribution Rate",
        (Locale::ZhCn, "touch_point_name") => "触点名称",
        (Locale::ZhCn, "trigger_count") => "触发次数",
        (Locale::ZhCn, "total_conversion") if value_based => "转化总价值",
        (Locale::ZhCn, "total_conversion") => "转化总数",
        (Locale::ZhCn, "triggers_with_conversion") => "带来转化的触发次数",
        (Locale::ZhCn, "contribution") if value_based => "贡献（价值）",
        (Locale::ZhCn, "contribution") => "贡献",
        (Locale::ZhCn, "contribution_rate") => "贡献率",
        _ => column,
    };
    label.to_string()
}

/// Labels for every result column, in output order
pub fn column_labels(locale: Locale, compute_method: ComputeMethod) -> Vec<(String, String)> {
    RESULT_COLUMNS
        .iter()
        .map(|c| (c.to_string(), column_label(locale, c, compute_method)))
        .collect()
}

pub fn date_range_label(locale: Locale) -> &'static str {
    match locale {
        Locale::EnUs => "Date Range",
        Locale::ZhCn => "日期范围",
    }
}
