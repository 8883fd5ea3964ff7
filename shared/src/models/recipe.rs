//! Recipe (bill of materials) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recipe line.
///
/// Product name, unit and price are copied from the catalog when the recipe
/// is saved, so later catalog changes never alter an existing recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub product_name: String,
    pub unit: String,
    pub price: Decimal,
}

impl RecipeLine {
    /// `price × quantity`, `None` if it does not fit a decimal
    pub fn line_cost(&self) -> Option<Decimal> {
        self.price.checked_mul(self.quantity)
    }
}

/// A named bill of materials owned by a department
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    /// Owning department, referenced by name
    pub department_name: String,
    pub products: Vec<RecipeLine>,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sum of `price × quantity` over all lines, `None` on overflow
pub fn recipe_total_cost(lines: &[RecipeLine]) -> Option<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.line_cost()?))
}
