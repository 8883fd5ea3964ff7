//! Recipe service: priced bills of materials and requirement aggregation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{ActivityAction, EntityType, Recipe, RecipeLine};
use crate::services::{ActivityService, CatalogService};
use shared::{
    aggregate_requirements, price_recipe_lines, referenced_product_ids, requested_recipe_ids,
    validate_batch, PricedRecipe, RecipeFactor, RecipeLineInput, RequirementSummary,
};

/// Recipe service for managing recipes and computing ingredient needs
#[derive(Clone)]
pub struct RecipeService {
    db: PgPool,
}

/// Input for creating a recipe
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipeInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "Department name is required"))]
    pub department_name: String,
    #[serde(default)]
    pub products: Vec<RecipeLineInput>,
}

/// Input for updating a recipe. Lines are re-priced when supplied.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecipeInput {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Department name cannot be empty"))]
    pub department_name: Option<String>,
    pub products: Option<Vec<RecipeLineInput>>,
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: Uuid,
    name: String,
    department_name: String,
    products: Json<Vec<RecipeLine>>,
    total_cost: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            name: row.name,
            department_name: row.department_name,
            products: row.products.0,
            total_cost: row.total_cost,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const RECIPE_COLUMNS: &str =
    "id, name, department_name, products, total_cost, created_at, updated_at";

impl RecipeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Price submitted lines against the current catalog.
    ///
    /// Every offending line is reported; nothing is priced unless all are valid.
    pub async fn price_lines(&self, lines: &[RecipeLineInput]) -> AppResult<PricedRecipe> {
        let ids = referenced_product_ids(lines);
        let catalog = CatalogService::new(self.db.clone())
            .product_snapshots(&ids)
            .await?;
        Ok(price_recipe_lines(lines, &catalog)?)
    }

    pub async fn list_recipes(&self) -> AppResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {} FROM recipes ORDER BY name",
            RECIPE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    pub async fn get_recipe(&self, recipe_id: Uuid) -> AppResult<Recipe> {
        sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {} FROM recipes WHERE id = $1",
            RECIPE_COLUMNS
        ))
        .bind(recipe_id)
        .fetch_optional(&self.db)
        .await?
        .map(Recipe::from)
        .ok_or_else(|| AppError::NotFound("Recipe".to_string()))
    }

    /// Case-insensitive name search
    pub async fn search_recipes(&self, query: &str) -> AppResult<Vec<Recipe>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("q", "Search query is required"));
        }

        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {} FROM recipes WHERE name ILIKE '%' || $1 || '%' ORDER BY name",
            RECIPE_COLUMNS
        ))
        .bind(query)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    /// Fetch every recipe in `ids` that exists, in one query
    pub async fn fetch_recipes(&self, ids: &[Uuid]) -> AppResult<Vec<Recipe>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {} FROM recipes WHERE id = ANY($1)",
            RECIPE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    pub async fn create_recipe(&self, user_id: Uuid, input: CreateRecipeInput) -> AppResult<Recipe> {
        input.validate()?;
        let priced = self.price_lines(&input.products).await?;

        let recipe: Recipe = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            INSERT INTO recipes (name, department_name, products, total_cost)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            RECIPE_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(input.department_name.trim())
        .bind(Json(&priced.lines))
        .bind(priced.total_cost)
        .fetch_one(&self.db)
        .await?
        .into();

        tracing::info!(recipe_id = %recipe.id, total_cost = %recipe.total_cost, "Recipe created");

        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                ActivityAction::Create,
                EntityType::Recipe,
                recipe.id,
                json!(recipe),
            )
            .await;

        Ok(recipe)
    }

    pub async fn update_recipe(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        input: UpdateRecipeInput,
    ) -> AppResult<Recipe> {
        input.validate()?;
        let existing = self.get_recipe(recipe_id).await?;

        let (lines, total_cost) = match input.products {
            Some(ref products) => {
                let priced = self.price_lines(products).await?;
                (priced.lines, priced.total_cost)
            }
            None => (existing.products.clone(), existing.total_cost),
        };

        let updated: Recipe = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            UPDATE recipes
            SET name = $1, department_name = $2, products = $3, total_cost = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {}
            "#,
            RECIPE_COLUMNS
        ))
        .bind(input.name.as_deref().map(str::trim).unwrap_or(&existing.name))
        .bind(
            input
                .department_name
                .as_deref()
                .map(str::trim)
                .unwrap_or(&existing.department_name),
        )
        .bind(Json(&lines))
        .bind(total_cost)
        .bind(recipe_id)
        .fetch_one(&self.db)
        .await?
        .into();

        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                ActivityAction::Update,
                EntityType::Recipe,
                recipe_id,
                json!({ "old": existing, "new": updated }),
            )
            .await;

        Ok(updated)
    }

    pub async fn delete_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
        let existing = self.get_recipe(recipe_id).await?;

        sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .execute(&self.db)
            .await?;

        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                ActivityAction::Delete,
                EntityType::Recipe,
                recipe_id,
                json!(existing),
            )
            .await;

        Ok(())
    }

    /// Aggregate ingredient needs for a batch of `{recipe, factor}` pairs.
    ///
    /// All recipes are fetched in one query; one missing id rejects the batch.
    pub async fn calculate_requirements(&self, batch: &[RecipeFactor]) -> AppResult<RequirementSummary> {
        validate_batch(batch)?;
        let recipes = self.fetch_recipes(&requested_recipe_ids(batch)).await?;
        let summary = aggregate_requirements(batch, &recipes)?;

        tracing::debug!(
            recipes = batch.len(),
            ingredients = summary.ingredients.len(),
            total_cost = %summary.total_cost,
            "Aggregated ingredient requirements"
        );
        Ok(summary)
    }
}
