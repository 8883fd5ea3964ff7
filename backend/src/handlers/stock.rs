//! Stock ledger HTTP handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::Stock;
use crate::services::stock::{
    AddStockInput, AdjustStockInput, AdjustmentSummary, RemoveStockInput, SinkTransferInput,
    StockValuation, StockView, TransferInput, TransferSummary,
};
use crate::services::StockService;
use crate::AppState;

pub async fn list_stocks(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StockView>>> {
    let service = StockService::new(state.db.clone());
    Ok(Json(service.list_stocks().await?))
}

pub async fn stocks_by_department(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Vec<StockView>>> {
    let Path(department) = path?;
    let service = StockService::new(state.db.clone());
    Ok(Json(service.stocks_by_department(&department).await?))
}

pub async fn low_stock(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StockView>>> {
    let service = StockService::new(state.db.clone());
    Ok(Json(service.low_stock().await?))
}

pub async fn total_value(
    State(state): State<AppState>,
) -> AppResult<Json<StockValuation>> {
    let service = StockService::new(state.db.clone());
    Ok(Json(service.total_value().await?))
}

pub async fn add_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<AddStockInput>, JsonRejection>,
) -> AppResult<Json<Stock>> {
    let Json(input) = payload?;
    let service = StockService::new(state.db.clone());
    Ok(Json(service.add_stock(current_user.0.user_id, input).await?))
}

pub async fn transfer_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<TransferInput>, JsonRejection>,
) -> AppResult<Json<TransferSummary>> {
    let Json(input) = payload?;
    let service = StockService::new(state.db.clone());
    Ok(Json(service.transfer(current_user.0.user_id, input).await?))
}

pub async fn transfer_to_trash(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<SinkTransferInput>, JsonRejection>,
) -> AppResult<Json<TransferSummary>> {
    let Json(input) = payload?;
    let service = StockService::new(state.db.clone());
    Ok(Json(service.transfer_to_trash(current_user.0.user_id, input).await?))
}

pub async fn transfer_to_used(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<SinkTransferInput>, JsonRejection>,
) -> AppResult<Json<TransferSummary>> {
    let Json(input) = payload?;
    let service = StockService::new(state.db.clone());
    Ok(Json(service.transfer_to_used(current_user.0.user_id, input).await?))
}

pub async fn remove_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<RemoveStockInput>, JsonRejection>,
) -> AppResult<Json<Stock>> {
    let Json(input) = payload?;
    let service = StockService::new(state.db.clone());
    Ok(Json(service.remove_stock(current_user.0.user_id, input).await?))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<AdjustStockInput>, JsonRejection>,
) -> AppResult<Json<AdjustmentSummary>> {
    let Json(input) = payload?;
    let service = StockService::new(state.db.clone());
    Ok(Json(service.adjust_stock(current_user.0.user_id, input).await?))
}
