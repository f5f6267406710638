//! Attribution request types
//!
//! `AttributionRequestBody` is the wire shape: every enum-like field arrives as a
//! plain string so an unsupported value becomes a validation message instead of
//! a decode failure. `AttributionRequest` is the typed form produced by
//! `validation::parse`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribution request as received over HTTP (camelCase JSON)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionRequestBody {
    pub project_id: Option<String>,
    pub app_id: Option<String>,
    pub model_type: Option<String>,

    pub touch_point_event_name: Option<String>,
    #[serde(default)]
    pub additional_touch_point_event_names: Vec<String>,
    pub conversion_event_name: Option<String>,

    pub time_scope_type: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub last_n: Option<i64>,
    pub time_unit: Option<String>,

    pub dashboard_id: Option<String>,
    pub sheet_id: Option<String>,

    pub locale: Option<String>,
    pub chart_type: Option<String>,
    pub view_name: Option<String>,
    pub action: Option<String>,

    pub compute_method: Option<String>,
    pub attribution_window: Option<AttributionWindowBody>,
    pub position_weights: Option<PositionWeightsBody>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionWindowBody {
    #[serde(rename = "type")]
    pub window_type: Option<String>,
    pub seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionWeightsBody {
    pub first: Option<f64>,
    pub last: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelType {
    FirstTouch,
    LastTouch,
    Linear,
    Position,
}

impl ModelType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FIRST_TOUCH" => Some(ModelType::FirstTouch),
            "LAST_TOUCH" => Some(ModelType::LastTouch),
            "LINEAR" => Some(ModelType::Linear),
            "POSITION" => Some(ModelType::Position),
            _ => None,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::FirstTouch => write!(f, "FIRST_TOUCH"),
            ModelType::LastTouch => write!(f, "LAST_TOUCH"),
            ModelType::Linear => write!(f, "LINEAR"),
            ModelType::Position => write!(f, "POSITION"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DAY" => Some(TimeUnit::Day),
            "WEEK" => Some(TimeUnit::Week),
            "MONTH" => Some(TimeUnit::Month),
            "YEAR" => Some(TimeUnit::Year),
            _ => None,
        }
    }

    /// Date part keyword understood by `DATEADD`
    pub fn as_sql(&self) -> &'static str {
        match self {
            TimeUnit::Day => "DAY",
            TimeUnit::Week => "WEEK",
            TimeUnit::Month => "MONTH",
            TimeUnit::Year => "YEAR",
        }
    }
}

/// Requested time scope; absolute dates are inclusive local calendar days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeScope {
    Fixed { start: NaiveDate, end: NaiveDate },
    Relative { last_n: u32, unit: TimeUnit },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Preview,
    Publish,
}

impl Action {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PREVIEW" => Some(Action::Preview),
            "PUBLISH" => Some(Action::Publish),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-CN")]
    ZhCn,
}

impl Locale {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en-US" | "en_US" | "en" => Some(Locale::EnUs),
            "zh-CN" | "zh_CN" | "zh" => Some(Locale::ZhCn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartType {
    #[default]
    Table,
    Bar,
}

impl ChartType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TABLE" => Some(ChartType::Table),
            "BAR" => Some(ChartType::Bar),
            _ => None,
        }
    }
}

/// What a conversion is worth when crediting touch points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputeMethod {
    /// Each conversion is worth 1
    #[default]
    EventCount,
    /// Each conversion is worth its `event_value`
    SumValue,
}

impl ComputeMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "EVENT_COUNT" => Some(ComputeMethod::EventCount),
            "SUM_VALUE" => Some(ComputeMethod::SumValue),
            _ => None,
        }
    }
}

/// Lookback restriction between a touch and the conversion it is credited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributionWindow {
    #[default]
    None,
    Session,
    Customize { seconds: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionWeights {
    pub first: f64,
    pub last: f64,
}

impl Default for PositionWeights {
    fn default() -> Self {
        Self { first: 0.4, last: 0.4 }
    }
}

impl PositionWeights {
    /// Share left for the middle touches
    pub fn middle(&self) -> f64 {
        1.0 - self.first - self.last
    }
}

/// Whether the visual lands in a fresh dashboard or an existing sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardTarget {
    Fresh,
    Existing { dashboard_id: String, sheet_id: String },
}

/// Validated, strongly typed attribution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionRequest {
    pub project_id: String,
    pub app_id: String,
    pub model_type: ModelType,
    /// Primary touch point first, then the additional ones, without duplicates
    pub touch_point_event_names: Vec<String>,
    pub conversion_event_name: String,
    pub time_scope: TimeScope,
    pub target: DashboardTarget,
    pub locale: Locale,
    pub chart_type: ChartType,
    pub view_name: String,
    pub action: Action,
    pub compute_method: ComputeMethod,
    pub attribution_window: AttributionWindow,
    pub position_weights: PositionWeights,
}
