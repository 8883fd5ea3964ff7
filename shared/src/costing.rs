//! Recipe costing
//!
//! Turns the raw lines a client submits into priced [`RecipeLine`] snapshots
//! using the current catalog, and derives the recipe's total cost.
//! Validation is all-or-nothing: every offending line is reported, and no
//! priced lines are returned unless every line is valid.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{recipe_total_cost, RecipeLine};

/// A recipe line as submitted by a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLineInput {
    pub product_id: Option<String>,
    pub quantity: Option<Decimal>,
}

impl RecipeLineInput {
    pub fn new(product_id: Uuid, quantity: Decimal) -> Self {
        Self {
            product_id: Some(product_id.to_string()),
            quantity: Some(quantity),
        }
    }

    /// The product id, if present and well-formed
    pub fn parsed_product_id(&self) -> Option<Uuid> {
        self.product_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    }
}

/// Catalog data copied onto a recipe line
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub price: Decimal,
}

/// Why a recipe line was rejected. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("Recipe must contain at least one product line")]
    NoLines,

    #[error("Line {position}: productId is required")]
    MissingProductId { position: usize },

    #[error("Line {position}: productId '{value}' is not a valid identifier")]
    InvalidProductId { position: usize, value: String },

    #[error("Line {position}: quantity is required")]
    MissingQuantity { position: usize },

    #[error("Line {position}: quantity must be greater than 0")]
    NonPositiveQuantity { position: usize },

    #[error("Line {position}: product {product_id} not found")]
    UnknownProduct { position: usize, product_id: Uuid },

    #[error("Line {position}: cost is too large to compute")]
    LineCostOverflow { position: usize },

    #[error("Recipe total cost is too large to compute")]
    TotalCostOverflow,
}

/// Priced line snapshot plus derived total
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedRecipe {
    pub lines: Vec<RecipeLine>,
    pub total_cost: Decimal,
}

/// Product ids referenced by well-formed lines, in submission order and
/// without duplicates. Used to batch the catalog lookup.
pub fn referenced_product_ids(lines: &[RecipeLineInput]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = Vec::with_capacity(lines.len());
    for id in lines.iter().filter_map(RecipeLineInput::parsed_product_id) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Price every line against `catalog`
pub fn price_recipe_lines(
    lines: &[RecipeLineInput],
    catalog: &HashMap<Uuid, ProductSnapshot>,
) -> Result<PricedRecipe, Vec<LineError>> {
    if lines.is_empty() {
        return Err(vec![LineError::NoLines]);
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let position = index + 1;

        let product_id = match line.product_id.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(LineError::MissingProductId { position });
                None
            }
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push(LineError::InvalidProductId {
                        position,
                        value: raw.to_string(),
                    });
                    None
                }
            },
        };

        let quantity = match line.quantity {
            None => {
                errors.push(LineError::MissingQuantity { position });
                None
            }
            Some(q) if q <= Decimal::ZERO => {
                errors.push(LineError::NonPositiveQuantity { position });
                None
            }
            Some(q) => Some(q),
        };

        let product = product_id.and_then(|id| {
            let found = catalog.get(&id);
            if found.is_none() {
                errors.push(LineError::UnknownProduct {
                    position,
                    product_id: id,
                });
            }
            found
        });

        if let (Some(product), Some(quantity)) = (product, quantity) {
            let line = RecipeLine {
                product_id: product.id,
                quantity,
                product_name: product.name.clone(),
                unit: product.unit.clone(),
                price: product.price,
            };
            if line.line_cost().is_some() {
                priced.push(line);
            } else {
                errors.push(LineError::LineCostOverflow { position });
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let total_cost = recipe_total_cost(&priced).ok_or_else(|| vec![LineError::TotalCostOverflow])?;
    Ok(PricedRecipe {
        lines: priced,
        total_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, unit: &str, price: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            unit: unit.to_string(),
            price: Decimal::from(price),
        }
    }

    fn catalog(products: &[ProductSnapshot]) -> HashMap<Uuid, ProductSnapshot> {
        products.iter().map(|p| (p.id, p.clone())).collect()
    }

    #[test]
    fn test_prices_lines_and_totals() {
        let flour = snapshot("Flour", "kg", 5);
        let butter = snapshot("Butter", "kg", 12);
        let lines = vec![
            RecipeLineInput::new(flour.id, Decimal::from(2)),
            RecipeLineInput::new(butter.id, Decimal::new(5, 1)),
        ];

        let priced = price_recipe_lines(&lines, &catalog(&[flour.clone(), butter])).unwrap();

        assert_eq!(priced.lines.len(), 2);
        assert_eq!(priced.lines[0].product_name, "Flour");
        assert_eq!(priced.lines[0].unit, "kg");
        // 2 × 5 + 0.5 × 12
        assert_eq!(priced.total_cost, Decimal::from(16));
    }

    #[test]
    fn test_reports_every_bad_line_by_position() {
        let flour = snapshot("Flour", "kg", 5);
        let missing = Uuid::new_v4();
        let lines = vec![
            RecipeLineInput::new(flour.id, Decimal::from(1)),
            RecipeLineInput {
                product_id: None,
                quantity: Some(Decimal::ONE),
            },
            RecipeLineInput::new(flour.id, Decimal::ZERO),
            RecipeLineInput::new(missing, Decimal::ONE),
            RecipeLineInput {
                product_id: Some("bogus".into()),
                quantity: None,
            },
        ];

        let errors = price_recipe_lines(&lines, &catalog(&[flour])).unwrap_err();

        assert_eq!(
            errors,
            vec![
                LineError::MissingProductId { position: 2 },
                LineError::NonPositiveQuantity { position: 3 },
                LineError::UnknownProduct {
                    position: 4,
                    product_id: missing
                },
                LineError::InvalidProductId {
                    position: 5,
                    value: "bogus".into()
                },
                LineError::MissingQuantity { position: 5 },
            ]
        );
    }

    #[test]
    fn test_rejects_empty_recipe() {
        let errors = price_recipe_lines(&[], &HashMap::new()).unwrap_err();
        assert_eq!(errors, vec![LineError::NoLines]);
    }

    #[test]
    fn test_referenced_ids_are_deduplicated() {
        let id = Uuid::new_v4();
        let lines = vec![
            RecipeLineInput::new(id, Decimal::ONE),
            RecipeLineInput::new(id, Decimal::TWO),
            RecipeLineInput::default(),
        ];
        assert_eq!(referenced_product_ids(&lines), vec![id]);
    }

    #[test]
    fn test_overflowing_cost_is_a_line_error() {
        let gold = ProductSnapshot {
            price: Decimal::MAX,
            ..snapshot("Gold", "g", 1)
        };
        let lines = vec![RecipeLineInput::new(gold.id, Decimal::from(2))];

        let errors = price_recipe_lines(&lines, &catalog(&[gold])).unwrap_err();
        assert_eq!(errors, vec![LineError::LineCostOverflow { position: 1 }]);
    }

    #[test]
    fn test_overflowing_total_is_rejected() {
        let gold = ProductSnapshot {
            price: Decimal::MAX,
            ..snapshot("Gold", "g", 1)
        };
        let lines = vec![
            RecipeLineInput::new(gold.id, Decimal::ONE),
            RecipeLineInput::new(gold.id, Decimal::ONE),
        ];

        let errors = price_recipe_lines(&lines, &catalog(&[gold])).unwrap_err();
        assert_eq!(errors, vec![LineError::TotalCostOverflow]);
    }
}
