//! Recipe HTTP handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::Recipe;
use crate::services::recipe::{CreateRecipeInput, UpdateRecipeInput};
use crate::services::RecipeService;
use crate::AppState;
use shared::{RecipeFactor, RequirementSummary};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn list_recipes(State(state): State<AppState>) -> AppResult<Json<Vec<Recipe>>> {
    let service = RecipeService::new(state.db.clone());
    Ok(Json(service.list_recipes().await?))
}

pub async fn search_recipes(
    State(state): State<AppState>,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Recipe>>> {
    let Query(query) = params?;
    let service = RecipeService::new(state.db.clone());
    Ok(Json(service.search_recipes(&query.q).await?))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<Recipe>> {
    let Path(recipe_id) = path?;
    let service = RecipeService::new(state.db.clone());
    Ok(Json(service.get_recipe(recipe_id).await?))
}

/// Create a recipe; lines are priced from the current catalog
pub async fn create_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<CreateRecipeInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let Json(input) = payload?;
    let service = RecipeService::new(state.db.clone());
    let recipe = service.create_recipe(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateRecipeInput>, JsonRejection>,
) -> AppResult<Json<Recipe>> {
    let Path(recipe_id) = path?;
    let Json(input) = payload?;
    let service = RecipeService::new(state.db.clone());
    let recipe = service
        .update_recipe(current_user.0.user_id, recipe_id, input)
        .await?;
    Ok(Json(recipe))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(recipe_id) = path?;
    let service = RecipeService::new(state.db.clone());
    service.delete_recipe(current_user.0.user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Aggregate ingredient needs for `[{recipeId, factor}]`
pub async fn calculate_requirements(
    State(state): State<AppState>,
    payload: Result<Json<Vec<RecipeFactor>>, JsonRejection>,
) -> AppResult<Json<RequirementSummary>> {
    let Json(batch) = payload?;
    let service = RecipeService::new(state.db.clone());
    Ok(Json(service.calculate_requirements(&batch).await?))
}
