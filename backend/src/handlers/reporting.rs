//! Reporting handlers for analytics and data export

use axum::{
    extract::{
        rejection::QueryRejection,
        Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::AppResult;
use crate::services::reporting::{ComparisonCsvRow, ReportQuery};
use crate::services::ReportingService;
use crate::AppState;

/// Planned ingredient usage against recorded stock outflow
pub async fn ingredient_comparison(
    State(state): State<AppState>,
    params: Result<Query<ReportQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = params?;
    let service = ReportingService::new(state.db.clone());
    let tolerance = state.config.reports.usage_tolerance_percent;
    let report = service.ingredient_comparison(&query, tolerance).await?;

    if query.wants_csv() {
        let rows: Vec<ComparisonCsvRow> = report.usage.rows.iter().map(ComparisonCsvRow::from).collect();
        let csv = ReportingService::export_to_csv(&rows)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"ingredient_comparison.csv\""),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(report).into_response())
    }
}
