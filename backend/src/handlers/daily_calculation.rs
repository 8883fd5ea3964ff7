//! Daily calculation HTTP handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::DailyCalculation;
use crate::services::daily_calculation::{require_date, SaveDailyCalculationInput};
use crate::services::DailyCalculationService;
use crate::AppState;
use shared::DateRange;

/// Upsert the snapshot for a date
pub async fn save_daily_calculation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<SaveDailyCalculationInput>, JsonRejection>,
) -> AppResult<Json<DailyCalculation>> {
    let Json(input) = payload?;
    let service = DailyCalculationService::new(state.db.clone());
    Ok(Json(service.save(current_user.0.user_id, input).await?))
}

pub async fn get_daily_calculation(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<DailyCalculation>> {
    let Path(date) = path?;
    let date = require_date(&date, "date")?;
    let service = DailyCalculationService::new(state.db.clone());
    Ok(Json(service.get_by_date(date).await?))
}

pub async fn list_daily_calculations(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> AppResult<Json<Vec<DailyCalculation>>> {
    let Path((start_date, end_date)) = path?;
    let range = DateRange::new(
        require_date(&start_date, "startDate")?,
        require_date(&end_date, "endDate")?,
    )
    .map_err(|m| AppError::validation("endDate", m))?;

    let service = DailyCalculationService::new(state.db.clone());
    Ok(Json(service.list_range(&range).await?))
}
