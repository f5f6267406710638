//! Dashboard artifact definitions handed to the visualization provider

use crate::request::{Action, ChartType, Locale, TimeUnit};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    String,
    Integer,
    Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetColumn {
    pub name: String,
    pub data_type: ColumnType,
}

/// Custom-SQL dataset backing the visual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDefinition {
    pub dataset_id: String,
    /// Queryable view name; disposable for previews
    pub view_name: String,
    pub db_name: String,
    pub schema_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_arn: Option<String>,
    pub custom_sql: String,
    pub columns: Vec<DatasetColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLabel {
    pub column: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualDefinition {
    pub visual_id: String,
    pub title: String,
    pub chart_type: ChartType,
    pub column_labels: Vec<ColumnLabel>,
}

/// Dashboard parameter the filter controls bind to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterDeclaration {
    DateTime { name: String, default_value: NaiveDate },
    Integer { name: String, default_value: i64 },
    String { name: String, default_value: String },
}

impl ParameterDeclaration {
    pub fn name(&self) -> &str {
        match self {
            ParameterDeclaration::DateTime { name, .. }
            | ParameterDeclaration::Integer { name, .. }
            | ParameterDeclaration::String { name, .. } => name,
        }
    }
}

/// Control widget; it writes dashboard parameters, never dataset columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterKind {
    DateRange { start_parameter: String, end_parameter: String },
    RelativeDates { unit: TimeUnit, last_n_parameter: String, unit_parameter: String },
}

impl FilterKind {
    /// Parameters the control writes
    pub fn parameters(&self) -> [&str; 2] {
        match self {
            FilterKind::DateRange { start_parameter, end_parameter } => {
                [start_parameter.as_str(), end_parameter.as_str()]
            }
            FilterKind::RelativeDates { last_n_parameter, unit_parameter, .. } => {
                [last_n_parameter.as_str(), unit_parameter.as_str()]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterControl {
    pub control_id: String,
    pub title: String,
    pub filter: FilterKind,
}

/// Everything the provider needs to render one visual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualRequest {
    pub project_id: String,
    pub app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<String>,
    pub sheet_id: String,
    pub action: Action,
    pub locale: Locale,
    pub dataset: DatasetDefinition,
    pub visual: VisualDefinition,
    pub parameters: Vec<ParameterDeclaration>,
    pub filter_controls: Vec<FilterControl>,
}

/// Provider reply; an empty `embed_url` means the dashboard is not ready yet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHandle {
    #[serde(default)]
    pub dashboard_id: Option<String>,
    #[serde(default)]
    pub embed_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardArtifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<String>,
    pub sheet_id: String,
    pub visual_id: String,
    pub dataset: DatasetDefinition,
    pub visual: VisualDefinition,
    pub parameters: Vec<ParameterDeclaration>,
    pub filter_controls: Vec<FilterControl>,
    pub embed_url: String,
}
