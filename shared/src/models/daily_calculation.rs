//! Daily production calculation models

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One planned recipe for a day, scaled by `quantity`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationInput {
    pub recipe: Uuid,
    pub quantity: Decimal,
}

/// Aggregated demand for one product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngredientRequirement {
    pub product_id: Uuid,
    pub name: String,
    pub unit: String,
    pub required_quantity: Decimal,
    pub total_price: Decimal,
}

/// Snapshot of planned production for a calendar date (unique per date)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyCalculation {
    pub id: Uuid,
    pub date: NaiveDate,
    pub calculations: Vec<CalculationInput>,
    pub ingredient_requirements: Vec<IngredientRequirement>,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyCalculation {
    pub fn recipe_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.calculations.iter().map(|c| c.recipe)
    }

    /// Whether any planned recipe belongs to `department_name`.
    /// `owners` maps recipe id to its department name; unknown recipes match nothing.
    pub fn plans_for_department(&self, owners: &HashMap<Uuid, String>, department_name: &str) -> bool {
        self.recipe_ids().any(|id| {
            owners
                .get(&id)
                .is_some_and(|owner| owner.eq_ignore_ascii_case(department_name))
        })
    }
}

/// Keep the snapshots that plan at least one recipe of `department_name`
pub fn snapshots_for_department(
    snapshots: Vec<DailyCalculation>,
    owners: &HashMap<Uuid, String>,
    department_name: &str,
) -> Vec<DailyCalculation> {
    snapshots
        .into_iter()
        .filter(|s| s.plans_for_department(owners, department_name))
        .collect()
}
