//! Recipe costing tests
//!
//! Tests for priced recipe lines including:
//! - totalCost equals Σ price × quantity for any valid line list
//! - all-or-nothing validation of submitted lines

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    price_recipe_lines, recipe_total_cost, referenced_product_ids, LineError, ProductSnapshot,
    RecipeLineInput,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn product(name: &str, unit: &str, price: &str) -> ProductSnapshot {
    ProductSnapshot {
        id: Uuid::new_v4(),
        name: name.to_string(),
        unit: unit.to_string(),
        price: dec(price),
    }
}

fn catalog_of(products: &[ProductSnapshot]) -> HashMap<Uuid, ProductSnapshot> {
    products.iter().map(|p| (p.id, p.clone())).collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_lines_copy_catalog_data() {
        let flour = product("Flour", "kg", "1.20");
        let catalog = catalog_of(&[flour.clone()]);

        let priced = price_recipe_lines(&[RecipeLineInput::new(flour.id, dec("2.5"))], &catalog).unwrap();

        assert_eq!(priced.lines.len(), 1);
        let line = &priced.lines[0];
        assert_eq!(line.product_name, "Flour");
        assert_eq!(line.unit, "kg");
        assert_eq!(line.price, dec("1.20"));
        assert_eq!(priced.total_cost, dec("3.00"));
    }

    #[test]
    fn test_mixed_lines_total() {
        let flour = product("Flour", "kg", "1.20");
        let butter = product("Butter", "kg", "8.00");
        let eggs = product("Eggs", "pcs", "0.25");
        let catalog = catalog_of(&[flour.clone(), butter.clone(), eggs.clone()]);

        let priced = price_recipe_lines(
            &[
                RecipeLineInput::new(flour.id, dec("1")),
                RecipeLineInput::new(butter.id, dec("0.5")),
                RecipeLineInput::new(eggs.id, dec("6")),
            ],
            &catalog,
        )
        .unwrap();

        // 1.20 + 4.00 + 1.50
        assert_eq!(priced.total_cost, dec("6.70"));
    }

    #[test]
    fn test_every_bad_line_is_reported() {
        let flour = product("Flour", "kg", "1.20");
        let catalog = catalog_of(&[flour.clone()]);
        let unknown = Uuid::new_v4();

        let lines = vec![
            RecipeLineInput::new(flour.id, dec("1")),
            RecipeLineInput {
                product_id: None,
                quantity: Some(dec("1")),
            },
            RecipeLineInput {
                product_id: Some("not-a-uuid".to_string()),
                quantity: Some(dec("1")),
            },
            RecipeLineInput::new(flour.id, dec("0")),
            RecipeLineInput::new(unknown, dec("1")),
        ];

        let errors = price_recipe_lines(&lines, &catalog).unwrap_err();
        assert_eq!(
            errors,
            vec![
                LineError::MissingProductId { position: 2 },
                LineError::InvalidProductId {
                    position: 3,
                    value: "not-a-uuid".to_string()
                },
                LineError::NonPositiveQuantity { position: 4 },
                LineError::UnknownProduct {
                    position: 5,
                    product_id: unknown
                },
            ]
        );
    }

    #[test]
    fn test_empty_recipe_rejected() {
        let errors = price_recipe_lines(&[], &HashMap::new()).unwrap_err();
        assert_eq!(errors, vec![LineError::NoLines]);
    }

    #[test]
    fn test_missing_quantity_rejected() {
        let flour = product("Flour", "kg", "1.20");
        let catalog = catalog_of(&[flour.clone()]);
        let line = RecipeLineInput {
            product_id: Some(flour.id.to_string()),
            quantity: None,
        };

        let errors = price_recipe_lines(&[line], &catalog).unwrap_err();
        assert_eq!(errors, vec![LineError::MissingQuantity { position: 1 }]);
    }

    #[test]
    fn test_referenced_ids_are_distinct() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lines = vec![
            RecipeLineInput::new(a, dec("1")),
            RecipeLineInput::new(b, dec("1")),
            RecipeLineInput::new(a, dec("2")),
            RecipeLineInput {
                product_id: Some("bogus".to_string()),
                quantity: Some(dec("1")),
            },
        ];

        assert_eq!(referenced_product_ids(&lines), vec![a, b]);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Price in cents and quantity in thousandths
    fn line_strategy() -> impl Strategy<Value = (i64, i64)> {
        (0i64..100_000, 1i64..1_000_000)
    }

    proptest! {
        #[test]
        fn prop_total_cost_is_sum_of_lines(lines in prop::collection::vec(line_strategy(), 1..12)) {
            let products: Vec<ProductSnapshot> = lines
                .iter()
                .enumerate()
                .map(|(i, (cents, _))| ProductSnapshot {
                    id: Uuid::new_v4(),
                    name: format!("Product {}", i),
                    unit: "kg".to_string(),
                    price: Decimal::new(*cents, 2),
                })
                .collect();
            let catalog = catalog_of(&products);

            let inputs: Vec<RecipeLineInput> = products
                .iter()
                .zip(&lines)
                .map(|(p, (_, thousandths))| RecipeLineInput::new(p.id, Decimal::new(*thousandths, 3)))
                .collect();

            let priced = price_recipe_lines(&inputs, &catalog).unwrap();

            let expected: Decimal = lines
                .iter()
                .map(|(cents, thousandths)| Decimal::new(*cents, 2) * Decimal::new(*thousandths, 3))
                .sum();

            prop_assert_eq!(priced.lines.len(), lines.len());
            prop_assert_eq!(priced.total_cost, expected);
            prop_assert_eq!(priced.total_cost, recipe_total_cost(&priced.lines).unwrap());
        }

        #[test]
        fn prop_non_positive_quantity_always_rejected(qty in -1000i64..=0) {
            let flour = product("Flour", "kg", "1.00");
            let catalog = catalog_of(&[flour.clone()]);

            let result = price_recipe_lines(&[RecipeLineInput::new(flour.id, Decimal::from(qty))], &catalog);
            prop_assert!(result.is_err());
        }
    }
}
