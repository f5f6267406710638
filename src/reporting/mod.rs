//! Reporting / visualization adapter
//!
//! Turns a generated attribution statement into a dashboard artifact: a
//! custom-SQL dataset over a deterministically named view, a visual with
//! locale-aware labels, and time-scope parameters + filter controls. The
//! statement's time bounds are `<<$param>>` placeholders of those parameters,
//! so moving a control re-filters the dataset without regenerating SQL.

pub mod artifact;
pub mod labels;
pub mod provider;

pub use artifact::{
    ColumnLabel, ColumnType, DashboardArtifact, DatasetColumn, DatasetDefinition, FilterControl,
    FilterKind, ParameterDeclaration, ProviderHandle, VisualDefinition, VisualRequest,
};
pub use provider::{HttpVisualizationProvider, VisualizationProvider};
pub use crate::sql::template::{PARAM_DATE_END, PARAM_DATE_START, PARAM_LAST_N, PARAM_TIME_UNIT};

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::request::{Action, AttributionRequest, DashboardTarget, TimeScope};
use crate::sql::RESULT_COLUMNS;
use tracing::info;
use uuid::Uuid;

/// Prefix of disposable preview views
pub const PREVIEW_VIEW_PREFIX: &str = "_tmp_";

/// View name for `(view_name, action)`. Previews share one disposable name per
/// view so reruns overwrite instead of accumulating.
pub fn derived_view_name(view_name: &str, action: Action) -> String {
    match action {
        Action::Preview => format!("{}{}", PREVIEW_VIEW_PREFIX, view_name),
        Action::Publish => view_name.to_string(),
    }
}

/// Stable dataset id for a project/app/view triple
pub fn dataset_id(project_id: &str, app_id: &str, derived_view: &str) -> String {
    let key = format!("{}/{}/{}", project_id, app_id, derived_view);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

fn dataset_columns() -> Vec<DatasetColumn> {
    RESULT_COLUMNS
        .iter()
        .map(|name| DatasetColumn {
            name: name.to_string(),
            data_type: match *name {
                "touch_point_name" => ColumnType::String,
                "trigger_count" | "triggers_with_conversion" => ColumnType::Integer,
                _ => ColumnType::Decimal,
            },
        })
        .collect()
}

fn time_scope_controls(
    request: &AttributionRequest,
) -> (Vec<ParameterDeclaration>, Vec<FilterControl>) {
    let title = labels::date_range_label(request.locale).to_string();
    let control_id = Uuid::new_v4().to_string();
    match &request.time_scope {
        TimeScope::Fixed { start, end } => (
            vec![
                ParameterDeclaration::DateTime {
                    name: PARAM_DATE_START.to_string(),
                    default_value: *start,
                },
                ParameterDeclaration::DateTime {
                    name: PARAM_DATE_END.to_string(),
                    default_value: *end,
                },
            ],
            vec![FilterControl {
                control_id,
                title,
                filter: FilterKind::DateRange {
                    start_parameter: PARAM_DATE_START.to_string(),
                    end_parameter: PARAM_DATE_END.to_string(),
                },
            }],
        ),
        TimeScope::Relative { last_n, unit } => (
            vec![
                ParameterDeclaration::Integer {
                    name: PARAM_LAST_N.to_string(),
                    default_value: i64::from(*last_n),
                },
                ParameterDeclaration::String {
                    name: PARAM_TIME_UNIT.to_string(),
                    default_value: unit.as_sql().to_string(),
                },
            ],
            vec![FilterControl {
                control_id,
                title,
                filter: FilterKind::RelativeDates {
                    unit: *unit,
                    last_n_parameter: PARAM_LAST_N.to_string(),
                    unit_parameter: PARAM_TIME_UNIT.to_string(),
                },
            }],
        ),
    }
}

/// Assemble the provider request for one visual. Pure; no I/O.
pub fn build_visual_request(
    sheet_id: &str,
    view_name: &str,
    query: &str,
    pipeline: &Pipeline,
    request: &AttributionRequest,
) -> VisualRequest {
    let derived_view = derived_view_name(view_name, request.action);
    let dataset = DatasetDefinition {
        dataset_id: dataset_id(&pipeline.project_id, &request.app_id, &derived_view),
        view_name: derived_view,
        db_name: request.project_id.clone(),
        schema_name: request.app_id.clone(),
        data_source_arn: pipeline.data_source_arn.clone(),
        custom_sql: query.to_string(),
        columns: dataset_columns(),
    };

    let visual = VisualDefinition {
        visual_id: Uuid::new_v4().to_string(),
        title: labels::visual_title(request.locale, request.model_type),
        chart_type: request.chart_type,
        column_labels: labels::column_labels(request.locale, request.compute_method)
            .into_iter()
            .map(|(column, label)| ColumnLabel { column, label })
            .collect(),
    };

    let (parameters, filter_controls) = time_scope_controls(request);

    let dashboard_id = match &request.target {
        DashboardTarget::Existing { dashboard_id, .. } => Some(dashboard_id.clone()),
        DashboardTarget::Fresh => None,
    };

    VisualRequest {
        project_id: request.project_id.clone(),
        app_id: request.app_id.clone(),
        dashboard_id,
        sheet_id: sheet_id.to_string(),
        action: request.action,
        locale: request.locale,
        dataset,
        visual,
        parameters,
        filter_controls,
    }
}

/// Build the visual request, hand it to the provider and return the artifact.
pub async fn create_dashboard_visuals(
    provider: &dyn VisualizationProvider,
    sheet_id: &str,
    view_name: &str,
    query: &str,
    pipeline: &Pipeline,
    request: &AttributionRequest,
) -> Result<DashboardArtifact> {
    let visual_request = build_visual_request(sheet_id, view_name, query, pipeline, request);
    info!(
        "📊 Creating visual {} on sheet {} (dataset view {})",
        visual_request.visual.visual_id, sheet_id, visual_request.dataset.view_name
    );

    let handle = provider.publish(&visual_request).await?;

    Ok(DashboardArtifact {
        dashboard_id: visual_request.dashboard_id.or(handle.dashboard_id),
        sheet_id: visual_request.sheet_id,
        visual_id: visual_request.visual.visual_id.clone(),
        dataset: visual_request.dataset,
        visual: visual_request.visual,
        parameters: visual_request.parameters,
        filter_controls: visual_request.filter_controls,
        embed_url: handle.embed_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{
        AttributionWindow, ChartType, ComputeMethod, Locale, ModelType, PositionWeights, TimeUnit,
    };
    use chrono::NaiveDate;

    fn pipeline() -> Pipeline {
        Pipeline {
            project_id: "p1".to_string(),
            pipeline_id: "pipe".to_string(),
            region: "us-east-1".to_string(),
            data_source_arn: Some("arn:source".to_string()),
            timezone: Vec::new(),
        }
    }

    fn request(action: Action, time_scope: TimeScope) -> AttributionRequest {
        AttributionRequest {
            project_id: "p1".to_string(),
            app_id: "a1".to_string(),
            model_type: ModelType::Linear,
            touch_point_event_names: vec!["view_item".to_string()],
            conversion_event_name: "purchase".to_string(),
            time_scope,
            target: DashboardTarget::Fresh,
            locale: Locale::ZhCn,
            chart_type: ChartType::Bar,
            view_name: "attr".to_string(),
            action,
            compute_method: ComputeMethod::EventCount,
            attribution_window: AttributionWindow::None,
            position_weights: PositionWeights::default(),
        }
    }

    fn fixed() -> TimeScope {
        TimeScope::Fixed {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        }
    }

    #[test]
    fn test_preview_view_names_are_stable() {
        assert_eq!(derived_view_name("attr", Action::Preview), "_tmp_attr");
        assert_eq!(derived_view_name("attr", Action::Publish), "attr");

        let first = build_visual_request("s1", "attr", "SELECT 1", &pipeline(), &request(Action::Preview, fixed()));
        let second = build_visual_request("s1", "attr", "SELECT 1", &pipeline(), &request(Action::Preview, fixed()));
        assert_eq!(first.dataset.dataset_id, second.dataset.dataset_id);
        assert_ne!(first.visual.visual_id, second.visual.visual_id);

        let published = build_visual_request("s1", "attr", "SELECT 1", &pipeline(), &request(Action::Publish, fixed()));
        assert_ne!(first.dataset.dataset_id, published.dataset.dataset_id);
    }

    #[test]
    fn test_fixed_scope_declares_date_parameters() {
        let req = build_visual_request("s1", "attr", "SELECT 1", &pipeline(), &request(Action::Preview, fixed()));
        let names: Vec<&str> = req.parameters.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec![PARAM_DATE_START, PARAM_DATE_END]);
        assert!(matches!(req.filter_controls[0].filter, FilterKind::DateRange { .. }));
        assert_eq!(req.filter_controls[0].title, "日期范围");
        assert_eq!(req.visual.title, "归因分析（线性）");
        assert_eq!(req.dataset.custom_sql, "SELECT 1");
        assert_eq!(req.dataset.columns.len(), RESULT_COLUMNS.len());
    }

    #[test]
    fn test_relative_scope_declares_relative_filter() {
        let scope = TimeScope::Relative { last_n: 7, unit: TimeUnit::Day };
        let req = build_visual_request("s1", "attr", "SELECT 1", &pipeline(), &request(Action::Publish, scope));
        assert_eq!(
            req.parameters[0],
            ParameterDeclaration::Integer { name: PARAM_LAST_N.to_string(), default_value: 7 }
        );
        assert!(matches!(
            req.filter_controls[0].filter,
            FilterKind::RelativeDates { unit: TimeUnit::Day, .. }
        ));
    }

    #[test]
    fn test_controls_drive_placeholders_in_dataset_sql() {
        use crate::encoding::encode_parameters;
        use crate::sql::build_attribution_sql;
        use crate::sql::template::placeholder;
        use crate::timezone::AppTimezone;

        let scopes = [fixed(), TimeScope::Relative { last_n: 7, unit: TimeUnit::Week }];
        for scope in scopes {
            let req = request(Action::Preview, scope);
            let params = encode_parameters(&req, AppTimezone::utc()).unwrap();
            let sql = build_attribution_sql(&params).unwrap();
            let visual = build_visual_request("s1", "attr", &sql, &pipeline(), &req);

            assert!(!visual.dataset.custom_sql.contains("'2024-01-01'"));

            let declared: Vec<&str> = visual.parameters.iter().map(|p| p.name()).collect();
            for name in &declared {
                assert!(
                    visual.dataset.custom_sql.contains(&placeholder(name)),
                    "dataset SQL does not use parameter {}",
                    name
                );
            }
            assert!(!visual.filter_controls.is_empty());
            for control in &visual.filter_controls {
                for name in control.filter.parameters() {
                    assert!(declared.contains(&name), "control writes undeclared parameter {}", name);
                }
            }
        }
    }
}
