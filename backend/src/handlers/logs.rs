//! Movement log and audit trail handlers

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ActivityLog, StockMovement};
use crate::services::activity::{ActivityFilter, MovementFilter};
use crate::services::reporting::{flatten_department_activity, ReportQuery};
use crate::services::{ActivityService, ReportingService};
use crate::AppState;

pub async fn list_stock_movements(
    State(state): State<AppState>,
    query: Result<Query<MovementFilter>, QueryRejection>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let Query(filter) = query?;
    let service = ActivityService::new(state.db.clone());
    Ok(Json(service.list_stock_movements(&filter).await?))
}

pub async fn product_movements(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let Path(product_id) = path?;
    let service = ActivityService::new(state.db.clone());
    Ok(Json(service.product_movements(product_id).await?))
}

pub async fn list_activity_logs(
    State(state): State<AppState>,
    query: Result<Query<ActivityFilter>, QueryRejection>,
) -> AppResult<Json<Vec<ActivityLog>>> {
    let Query(filter) = query?;
    let service = ActivityService::new(state.db.clone());
    Ok(Json(service.list_activity(&filter).await?))
}

pub async fn entity_activity(
    State(state): State<AppState>,
    path: Result<Path<(String, Uuid)>, PathRejection>,
) -> AppResult<Json<Vec<ActivityLog>>> {
    let Path((entity_type, entity_id)) = path?;
    let service = ActivityService::new(state.db.clone());
    Ok(Json(service.entity_activity(&entity_type, entity_id).await?))
}

/// Opening/closing stock and movement breakdown per department
pub async fn department_transfers(
    State(state): State<AppState>,
    params: Result<Query<ReportQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = params?;
    let service = ReportingService::new(state.db.clone());
    let report = service.department_transfers(&query).await?;

    if query.wants_csv() {
        let csv = ReportingService::export_to_csv(&flatten_department_activity(&report.departments))?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"department_transfers.csv\""),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(report).into_response())
    }
}
