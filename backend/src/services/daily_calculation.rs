//! Daily production plans
//!
//! One snapshot per calendar date. Saving a date recomputes its ingredient
//! requirements from the current recipes and replaces any earlier snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::{types::Json, FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ActivityAction, CalculationInput, DailyCalculation, EntityType, IngredientRequirement};
use crate::services::{ActivityService, RecipeService};
use shared::{
    parse_calendar_date, snapshots_for_department, DateRange, RecipeFactor, RequirementSummary,
};

#[derive(Clone)]
pub struct DailyCalculationService {
    db: PgPool,
}

/// Body of a snapshot upsert
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDailyCalculationInput {
    pub date: String,
    #[serde(default)]
    pub calculations: Vec<CalculationInput>,
}

#[derive(Debug, FromRow)]
struct DailyCalculationRow {
    id: Uuid,
    date: NaiveDate,
    calculations: Json<Vec<CalculationInput>>,
    ingredient_requirements: Json<Vec<IngredientRequirement>>,
    total_cost: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DailyCalculationRow> for DailyCalculation {
    fn from(row: DailyCalculationRow) -> Self {
        DailyCalculation {
            id: row.id,
            date: row.date,
            calculations: row.calculations.0,
            ingredient_requirements: row.ingredient_requirements.0,
            total_cost: row.total_cost,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CALCULATION_COLUMNS: &str =
    "id, date, calculations, ingredient_requirements, total_cost, created_at, updated_at";

/// Parse a date path/body parameter
pub fn require_date(raw: &str, field: &str) -> AppResult<NaiveDate> {
    parse_calendar_date(raw)
        .ok_or_else(|| AppError::validation(field, format!("Invalid date '{}'", raw.trim())))
}

impl DailyCalculationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Recompute and store the snapshot for a date
    pub async fn save(&self, user_id: Uuid, input: SaveDailyCalculationInput) -> AppResult<DailyCalculation> {
        let date = require_date(&input.date, "date")?;

        // An empty plan clears the day's requirements
        let summary = if input.calculations.is_empty() {
            RequirementSummary::default()
        } else {
            let batch: Vec<RecipeFactor> = input.calculations.iter().map(RecipeFactor::from).collect();
            RecipeService::new(self.db.clone())
                .calculate_requirements(&batch)
                .await?
        };

        let existed = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM daily_calculations WHERE date = $1",
        )
        .bind(date)
        .fetch_one(&self.db)
        .await?
            > 0;

        let snapshot: DailyCalculation = sqlx::query_as::<_, DailyCalculationRow>(&format!(
            r#"
            INSERT INTO daily_calculations (date, calculations, ingredient_requirements, total_cost)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (date) DO UPDATE
            SET calculations = EXCLUDED.calculations,
                ingredient_requirements = EXCLUDED.ingredient_requirements,
                total_cost = EXCLUDED.total_cost,
                updated_at = NOW()
            RETURNING {}
            "#,
            CALCULATION_COLUMNS
        ))
        .bind(date)
        .bind(Json(&input.calculations))
        .bind(Json(&summary.ingredients))
        .bind(summary.total_cost)
        .fetch_one(&self.db)
        .await?
        .into();

        tracing::info!(
            %date,
            ingredients = snapshot.ingredient_requirements.len(),
            total_cost = %snapshot.total_cost,
            "Daily calculation saved"
        );

        let action = if existed {
            ActivityAction::Update
        } else {
            ActivityAction::Create
        };
        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                action,
                EntityType::DailyCalculation,
                snapshot.id,
                json!({
                    "date": snapshot.date,
                    "calculations": snapshot.calculations,
                    "totalCost": snapshot.total_cost,
                }),
            )
            .await;

        Ok(snapshot)
    }

    pub async fn get_by_date(&self, date: NaiveDate) -> AppResult<DailyCalculation> {
        sqlx::query_as::<_, DailyCalculationRow>(&format!(
            "SELECT {} FROM daily_calculations WHERE date = $1",
            CALCULATION_COLUMNS
        ))
        .bind(date)
        .fetch_optional(&self.db)
        .await?
        .map(DailyCalculation::from)
        .ok_or_else(|| AppError::NotFound(format!("Daily calculation for {}", date)))
    }

    /// Snapshots in an inclusive range, ordered by date
    pub async fn list_range(&self, range: &DateRange) -> AppResult<Vec<DailyCalculation>> {
        let rows = sqlx::query_as::<_, DailyCalculationRow>(&format!(
            "SELECT {} FROM daily_calculations WHERE date >= $1 AND date <= $2 ORDER BY date",
            CALCULATION_COLUMNS
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DailyCalculation::from).collect())
    }

    /// Snapshots in range, keeping only those that plan at least one recipe
    /// owned by `department_name` when a department is given
    pub async fn list_for_department(
        &self,
        range: &DateRange,
        department_name: Option<&str>,
    ) -> AppResult<Vec<DailyCalculation>> {
        let snapshots = self.list_range(range).await?;
        let Some(department_name) = department_name else {
            return Ok(snapshots);
        };

        let mut recipe_ids: Vec<Uuid> = snapshots.iter().flat_map(|s| s.recipe_ids()).collect();
        recipe_ids.sort();
        recipe_ids.dedup();

        let owners: HashMap<Uuid, String> = RecipeService::new(self.db.clone())
            .fetch_recipes(&recipe_ids)
            .await?
            .into_iter()
            .map(|r| (r.id, r.department_name))
            .collect();

        Ok(snapshots_for_department(snapshots, &owners, department_name))
    }
}
