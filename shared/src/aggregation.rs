//! Ingredient requirement aggregation
//!
//! Expands `{recipe, factor}` pairs into one demand total per product. The
//! accumulator is built fresh for each computation and keeps entries in order
//! of first appearance.
//!
//! Entries are keyed by `(product, unit)`: a product that shows up under two
//! different units in different recipes yields two entries instead of one
//! silently mixed total.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CalculationInput, IngredientRequirement, Recipe, RecipeLine};

/// A recipe to produce `factor` times
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFactor {
    pub recipe_id: Uuid,
    pub factor: Decimal,
}

impl From<&CalculationInput> for RecipeFactor {
    fn from(input: &CalculationInput) -> Self {
        Self {
            recipe_id: input.recipe,
            factor: input.quantity,
        }
    }
}

/// Aggregated ingredient demand
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSummary {
    pub ingredients: Vec<IngredientRequirement>,
    pub total_cost: Decimal,
}

impl RequirementSummary {
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::with_capacity(self.ingredients.len());
        for ingredient in &self.ingredients {
            if !ids.contains(&ingredient.product_id) {
                ids.push(ingredient.product_id);
            }
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("At least one recipe is required")]
    EmptyBatch,

    #[error("Entry {position}: factor must be greater than 0")]
    InvalidFactor { position: usize },

    #[error("Entry {position}: factor must not exceed {}", max_factor())]
    FactorTooLarge { position: usize },

    #[error("Ingredient totals are too large to compute")]
    Overflow,

    #[error("Recipes not found: {}", format_ids(.0))]
    MissingRecipes(Vec<Uuid>),
}

fn format_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Largest production factor accepted for one recipe
pub fn max_factor() -> Decimal {
    Decimal::from(1_000_000)
}

fn add(total: Decimal, amount: Decimal) -> Result<Decimal, AggregationError> {
    total.checked_add(amount).ok_or(AggregationError::Overflow)
}

fn mul(a: Decimal, b: Decimal) -> Result<Decimal, AggregationError> {
    a.checked_mul(b).ok_or(AggregationError::Overflow)
}

/// Ordered per-product accumulator
#[derive(Debug, Default)]
pub struct RequirementAccumulator {
    entries: Vec<IngredientRequirement>,
    index: HashMap<(Uuid, String), usize>,
    total_cost: Decimal,
}

impl RequirementAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, product_id: Uuid, name: &str, unit: &str) -> &mut IngredientRequirement {
        let key = (product_id, unit.to_string());
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.entries.push(IngredientRequirement {
                    product_id,
                    name: name.to_string(),
                    unit: unit.to_string(),
                    required_quantity: Decimal::ZERO,
                    total_price: Decimal::ZERO,
                });
                let position = self.entries.len() - 1;
                self.index.insert(key, position);
                position
            }
        };
        &mut self.entries[position]
    }

    fn accumulate(
        &mut self,
        product_id: Uuid,
        name: &str,
        unit: &str,
        quantity: Decimal,
        cost: Decimal,
    ) -> Result<(), AggregationError> {
        let total_cost = add(self.total_cost, cost)?;
        let entry = self.slot(product_id, name, unit);
        let required_quantity = add(entry.required_quantity, quantity)?;
        let total_price = add(entry.total_price, cost)?;

        entry.required_quantity = required_quantity;
        entry.total_price = total_price;
        self.total_cost = total_cost;
        Ok(())
    }

    /// Add one recipe line scaled by `factor`
    pub fn add_line(&mut self, line: &RecipeLine, factor: Decimal) -> Result<(), AggregationError> {
        let quantity = mul(line.quantity, factor)?;
        let cost = mul(line.price, quantity)?;
        self.accumulate(line.product_id, &line.product_name, &line.unit, quantity, cost)
    }

    /// Add every line of a recipe scaled by `factor`
    pub fn add_recipe(&mut self, recipe: &Recipe, factor: Decimal) -> Result<(), AggregationError> {
        for line in &recipe.products {
            self.add_line(line, factor)?;
        }
        Ok(())
    }

    /// Merge an already aggregated requirement (e.g. from a stored snapshot)
    pub fn merge(&mut self, requirement: &IngredientRequirement) -> Result<(), AggregationError> {
        self.accumulate(
            requirement.product_id,
            &requirement.name,
            &requirement.unit,
            requirement.required_quantity,
            requirement.total_price,
        )
    }

    pub fn finish(self) -> RequirementSummary {
        RequirementSummary {
            ingredients: self.entries,
            total_cost: self.total_cost,
        }
    }
}

/// Check the batch shape before any lookup
pub fn validate_batch(requested: &[RecipeFactor]) -> Result<(), AggregationError> {
    if requested.is_empty() {
        return Err(AggregationError::EmptyBatch);
    }
    for (index, r) in requested.iter().enumerate() {
        if r.factor <= Decimal::ZERO {
            return Err(AggregationError::InvalidFactor { position: index + 1 });
        }
        if r.factor > max_factor() {
            return Err(AggregationError::FactorTooLarge { position: index + 1 });
        }
    }
    Ok(())
}

/// Distinct recipe ids of a batch, in request order
pub fn requested_recipe_ids(requested: &[RecipeFactor]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = Vec::with_capacity(requested.len());
    for r in requested {
        if !ids.contains(&r.recipe_id) {
            ids.push(r.recipe_id);
        }
    }
    ids
}

/// Aggregate a batch against the recipes fetched for it.
///
/// Fails without partial output if any requested recipe is absent from
/// `recipes`.
pub fn aggregate_requirements(
    requested: &[RecipeFactor],
    recipes: &[Recipe],
) -> Result<RequirementSummary, AggregationError> {
    validate_batch(requested)?;

    let by_id: HashMap<Uuid, &Recipe> = recipes.iter().map(|r| (r.id, r)).collect();
    let missing: Vec<Uuid> = requested_recipe_ids(requested)
        .into_iter()
        .filter(|id| !by_id.contains_key(id))
        .collect();
    if !missing.is_empty() {
        return Err(AggregationError::MissingRecipes(missing));
    }

    let mut accumulator = RequirementAccumulator::new();
    for r in requested {
        if let Some(recipe) = by_id.get(&r.recipe_id) {
            accumulator.add_recipe(recipe, r.factor)?;
        }
    }
    Ok(accumulator.finish())
}

/// Merge stored requirement lists (e.g. every snapshot in a date range)
pub fn merge_requirements<'a, I>(lists: I) -> Result<RequirementSummary, AggregationError>
where
    I: IntoIterator<Item = &'a [IngredientRequirement]>,
{
    let mut accumulator = RequirementAccumulator::new();
    for list in lists {
        for requirement in list {
            accumulator.merge(requirement)?;
        }
    }
    Ok(accumulator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn line(product_id: Uuid, name: &str, qty: i64, price: i64) -> RecipeLine {
        RecipeLine {
            product_id,
            quantity: Decimal::from(qty),
            product_name: name.to_string(),
            unit: "kg".to_string(),
            price: Decimal::from(price),
        }
    }

    fn recipe(lines: Vec<RecipeLine>) -> Recipe {
        let total_cost = crate::models::recipe_total_cost(&lines).unwrap();
        Recipe {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            department_name: "Kitchen".to_string(),
            products: lines,
            total_cost,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_single_recipe_scaled_by_factor() {
        let p = Uuid::new_v4();
        let a = recipe(vec![line(p, "P", 2, 5)]);
        assert_eq!(a.total_cost, Decimal::from(10));

        let summary = aggregate_requirements(
            &[RecipeFactor {
                recipe_id: a.id,
                factor: Decimal::from(3),
            }],
            &[a],
        )
        .unwrap();

        assert_eq!(summary.ingredients.len(), 1);
        assert_eq!(summary.ingredients[0].required_quantity, Decimal::from(6));
        assert_eq!(summary.ingredients[0].total_price, Decimal::from(30));
        assert_eq!(summary.total_cost, Decimal::from(30));
    }

    #[test]
    fn test_merges_shared_products_across_recipes() {
        let flour = Uuid::new_v4();
        let sugar = Uuid::new_v4();
        let bread = recipe(vec![line(flour, "Flour", 2, 1)]);
        let cake = recipe(vec![line(sugar, "Sugar", 1, 3), line(flour, "Flour", 1, 1)]);

        let summary = aggregate_requirements(
            &[
                RecipeFactor {
                    recipe_id: bread.id,
                    factor: Decimal::from(2),
                },
                RecipeFactor {
                    recipe_id: cake.id,
                    factor: Decimal::from(4),
                },
            ],
            &[bread, cake],
        )
        .unwrap();

        // Order of first appearance
        assert_eq!(summary.ingredients[0].product_id, flour);
        assert_eq!(summary.ingredients[1].product_id, sugar);
        // 2×2 + 1×4
        assert_eq!(summary.ingredients[0].required_quantity, Decimal::from(8));
        assert_eq!(summary.ingredients[1].required_quantity, Decimal::from(4));
        assert_eq!(summary.total_cost, Decimal::from(8 + 12));
    }

    #[test]
    fn test_missing_recipe_rejects_whole_batch() {
        let p = Uuid::new_v4();
        let known = recipe(vec![line(p, "P", 1, 1)]);
        let unknown = Uuid::new_v4();

        let err = aggregate_requirements(
            &[
                RecipeFactor {
                    recipe_id: known.id,
                    factor: Decimal::ONE,
                },
                RecipeFactor {
                    recipe_id: unknown,
                    factor: Decimal::ONE,
                },
            ],
            &[known],
        )
        .unwrap_err();

        assert_eq!(err, AggregationError::MissingRecipes(vec![unknown]));
        assert!(err.to_string().contains(&unknown.to_string()));
    }

    #[test]
    fn test_rejects_empty_batch_and_bad_factor() {
        assert_eq!(
            aggregate_requirements(&[], &[]).unwrap_err(),
            AggregationError::EmptyBatch
        );
        let err = validate_batch(&[
            RecipeFactor {
                recipe_id: Uuid::new_v4(),
                factor: Decimal::ONE,
            },
            RecipeFactor {
                recipe_id: Uuid::new_v4(),
                factor: Decimal::ZERO,
            },
        ])
        .unwrap_err();
        assert_eq!(err, AggregationError::InvalidFactor { position: 2 });
    }

    #[test]
    fn test_units_are_kept_apart() {
        let p = Uuid::new_v4();
        let mut grams = line(p, "Salt", 500, 0);
        grams.unit = "g".to_string();
        let kilos = line(p, "Salt", 1, 0);

        let mut acc = RequirementAccumulator::new();
        acc.add_line(&grams, Decimal::ONE).unwrap();
        acc.add_line(&kilos, Decimal::ONE).unwrap();
        let summary = acc.finish();

        assert_eq!(summary.ingredients.len(), 2);
        assert_eq!(summary.product_ids(), vec![p]);
    }

    #[test]
    fn test_merge_stored_requirements() {
        let p = Uuid::new_v4();
        let day = vec![IngredientRequirement {
            product_id: p,
            name: "P".into(),
            unit: "kg".into(),
            required_quantity: Decimal::from(50),
            total_price: Decimal::from(100),
        }];

        let summary = merge_requirements([day.as_slice(), day.as_slice()]).unwrap();
        assert_eq!(summary.ingredients[0].required_quantity, Decimal::from(100));
        assert_eq!(summary.total_cost, Decimal::from(200));
    }

    #[test]
    fn test_huge_factor_is_rejected_not_panicking() {
        let p = Uuid::new_v4();
        let a = recipe(vec![line(p, "P", 2, 5)]);

        let err = aggregate_requirements(
            &[RecipeFactor {
                recipe_id: a.id,
                factor: Decimal::MAX,
            }],
            &[a],
        )
        .unwrap_err();
        assert_eq!(err, AggregationError::FactorTooLarge { position: 1 });
    }

    #[test]
    fn test_line_overflow_reports_error() {
        let mut huge = line(Uuid::new_v4(), "Gold", 1, 1);
        huge.quantity = Decimal::MAX;
        huge.price = Decimal::from(2);

        let mut acc = RequirementAccumulator::new();
        assert_eq!(acc.add_line(&huge, Decimal::ONE), Err(AggregationError::Overflow));
        assert!(acc.finish().is_empty());
    }

    #[test]
    fn test_merge_overflow_reports_error() {
        let p = Uuid::new_v4();
        let day = vec![IngredientRequirement {
            product_id: p,
            name: "P".into(),
            unit: "kg".into(),
            required_quantity: Decimal::MAX,
            total_price: Decimal::ONE,
        }];

        assert_eq!(
            merge_requirements([day.as_slice(), day.as_slice()]),
            Err(AggregationError::Overflow)
        );
    }
}
