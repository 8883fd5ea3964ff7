//! Product and department HTTP handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{auth::require_admin, CurrentUser};
use crate::models::{Department, Product};
use crate::services::catalog::{CreateProductInput, DepartmentInput, UpdateProductInput};
use crate::services::CatalogService;
use crate::AppState;

// ============================================================================
// Products
// ============================================================================

pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.db.clone());
    Ok(Json(service.list_products().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<Product>> {
    let Path(product_id) = path?;
    let service = CatalogService::new(state.db.clone());
    Ok(Json(service.get_product(product_id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<CreateProductInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let Json(input) = payload?;
    let service = CatalogService::new(state.db.clone());
    let product = service.create_product(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProductInput>, JsonRejection>,
) -> AppResult<Json<Product>> {
    let Path(product_id) = path?;
    let Json(input) = payload?;
    let service = CatalogService::new(state.db.clone());
    let product = service
        .update_product(current_user.0.user_id, product_id, input)
        .await?;
    Ok(Json(product))
}

/// Delete a product (admin only)
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(product_id) = path?;
    require_admin(&current_user.0)?;
    let service = CatalogService::new(state.db.clone());
    service.delete_product(current_user.0.user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Departments
// ============================================================================

pub async fn list_departments(State(state): State<AppState>) -> AppResult<Json<Vec<Department>>> {
    let service = CatalogService::new(state.db.clone());
    Ok(Json(service.list_departments().await?))
}

pub async fn get_department(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<Department>> {
    let Path(department_id) = path?;
    let service = CatalogService::new(state.db.clone());
    Ok(Json(service.get_department(department_id).await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<DepartmentInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Department>)> {
    let Json(input) = payload?;
    let service = CatalogService::new(state.db.clone());
    let department = service
        .create_department(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn update_department(
    State(state): State<AppState>,
    current_user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<DepartmentInput>, JsonRejection>,
) -> AppResult<Json<Department>> {
    let Path(department_id) = path?;
    let Json(input) = payload?;
    let service = CatalogService::new(state.db.clone());
    let department = service
        .update_department(current_user.0.user_id, department_id, input)
        .await?;
    Ok(Json(department))
}

/// Delete a department (admin only)
pub async fn delete_department(
    State(state): State<AppState>,
    current_user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(department_id) = path?;
    require_admin(&current_user.0)?;
    let service = CatalogService::new(state.db.clone());
    service
        .delete_department(current_user.0.user_id, department_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
