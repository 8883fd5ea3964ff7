//! WebAssembly module for Stockroom
//!
//! Provides client-side computation for:
//! - Recipe cost previews before saving
//! - Ingredient requirement previews for a production plan
//! - Usage status classification
//! - Offline input validation
//!
//! Every bridge takes and returns JSON. Quantities and money are decimal
//! strings (numbers are accepted on input).

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

use shared::{
    aggregate_requirements, compare_usage, default_tolerance_percent, price_recipe_lines,
    ProductSnapshot, RecipeFactor, RecipeLineInput,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("stockroom-wasm ready"));
}

/// Catalog entry as sent by the client
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogProduct {
    id: Uuid,
    name: String,
    unit: String,
    price: Decimal,
}

fn to_js_error(message: String) -> JsValue {
    js_sys::Error::new(&message).into()
}

fn parse_decimal(raw: &str, field: &str) -> Result<Decimal, String> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| format!("{} is not a number: '{}'", field, raw))
}

fn recipe_cost_preview(lines_json: &str, catalog_json: &str) -> Result<String, String> {
    let lines: Vec<RecipeLineInput> =
        serde_json::from_str(lines_json).map_err(|e| format!("Invalid lines JSON: {}", e))?;
    let catalog: Vec<CatalogProduct> =
        serde_json::from_str(catalog_json).map_err(|e| format!("Invalid catalog JSON: {}", e))?;

    let catalog: HashMap<Uuid, ProductSnapshot> = catalog
        .into_iter()
        .map(|p| {
            (
                p.id,
                ProductSnapshot {
                    id: p.id,
                    name: p.name,
                    unit: p.unit,
                    price: p.price,
                },
            )
        })
        .collect();

    let priced = price_recipe_lines(&lines, &catalog).map_err(|errors| {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    })?;
    serde_json::to_string(&priced).map_err(|e| e.to_string())
}

fn requirement_preview(batch_json: &str, recipes_json: &str) -> Result<String, String> {
    let batch: Vec<RecipeFactor> =
        serde_json::from_str(batch_json).map_err(|e| format!("Invalid batch JSON: {}", e))?;
    let recipes: Vec<Recipe> =
        serde_json::from_str(recipes_json).map_err(|e| format!("Invalid recipes JSON: {}", e))?;

    let summary = aggregate_requirements(&batch, &recipes).map_err(|e| e.to_string())?;
    serde_json::to_string(&summary).map_err(|e| e.to_string())
}

fn usage_preview(required: &str, actual_out: &str, tolerance: Option<String>) -> Result<String, String> {
    let required = parse_decimal(required, "required")?;
    let actual_out = parse_decimal(actual_out, "actualOut")?;
    let tolerance = match tolerance {
        Some(raw) => parse_decimal(&raw, "tolerance")?,
        None => default_tolerance_percent(),
    };

    serde_json::to_string(&compare_usage(required, actual_out, tolerance)).map_err(|e| e.to_string())
}

/// Price recipe lines against a catalog snapshot.
///
/// Returns `{lines, totalCost}`; every invalid line is reported in the error.
#[wasm_bindgen]
pub fn preview_recipe_cost(lines_json: &str, catalog_json: &str) -> Result<String, JsValue> {
    recipe_cost_preview(lines_json, catalog_json).map_err(to_js_error)
}

/// Aggregate `[{recipeId, factor}]` against the given recipes.
///
/// Returns `{ingredients, totalCost}`.
#[wasm_bindgen]
pub fn preview_requirements(batch_json: &str, recipes_json: &str) -> Result<String, JsValue> {
    requirement_preview(batch_json, recipes_json).map_err(to_js_error)
}

/// Compare required and actual usage. `tolerance` defaults to 15 percent.
#[wasm_bindgen]
pub fn classify_usage_status(
    required: &str,
    actual_out: &str,
    tolerance: Option<String>,
) -> Result<String, JsValue> {
    usage_preview(required, actual_out, tolerance).map_err(to_js_error)
}

/// Whether a quantity string is a valid positive amount
#[wasm_bindgen]
pub fn is_valid_quantity(raw: &str) -> bool {
    parse_decimal(raw, "quantity")
        .ok()
        .is_some_and(|q| validate_positive_quantity(q).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{RequirementSummary, UsageStatus};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_recipe_cost_preview() {
        let flour = Uuid::new_v4();
        let catalog = format!(
            r#"[{{"id":"{}","name":"Flour","unit":"kg","price":"1.20"}}]"#,
            flour
        );
        let lines = format!(r#"[{{"productId":"{}","quantity":"2.5"}}]"#, flour);

        let json = recipe_cost_preview(&lines, &catalog).unwrap();
        let priced: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(dec(priced["totalCost"].as_str().unwrap()), dec("3"));
        assert_eq!(priced["lines"][0]["productName"], "Flour");
    }

    #[test]
    fn test_recipe_cost_preview_reports_lines() {
        let err = recipe_cost_preview(r#"[{"quantity": 1}]"#, "[]").unwrap_err();
        assert!(err.contains("Line 1"));

        let err = recipe_cost_preview("[]", "[]").unwrap_err();
        assert!(err.contains("at least one"));
    }

    #[test]
    fn test_requirement_preview() {
        let flour = Uuid::new_v4();
        let recipe_id = Uuid::new_v4();
        let recipes = format!(
            r#"[{{
                "id": "{recipe_id}",
                "name": "Bread",
                "departmentName": "Bakery",
                "products": [{{"productId": "{flour}", "quantity": "2", "productName": "Flour", "unit": "kg", "price": "5"}}],
                "totalCost": "10",
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            }}]"#
        );
        let batch = format!(r#"[{{"recipeId": "{recipe_id}", "factor": 3}}]"#);

        let json = requirement_preview(&batch, &recipes).unwrap();
        let summary: RequirementSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary.ingredients.len(), 1);
        assert_eq!(summary.ingredients[0].required_quantity, dec("6"));
        assert_eq!(summary.total_cost, dec("30"));
    }

    #[test]
    fn test_requirement_preview_missing_recipe() {
        let batch = format!(r#"[{{"recipeId": "{}", "factor": 1}}]"#, Uuid::new_v4());
        let err = requirement_preview(&batch, "[]").unwrap_err();
        assert!(err.starts_with("Recipes not found"));
    }

    #[test]
    fn test_usage_preview() {
        let json = usage_preview("100", "95", None).unwrap();
        let comparison: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(comparison["status"], "match");

        let json = usage_preview("100", "50", Some("60".to_string())).unwrap();
        let comparison: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(comparison["status"], "match");

        assert!(usage_preview("abc", "1", None).is_err());
    }

    #[test]
    fn test_is_valid_quantity() {
        assert!(is_valid_quantity("2.5"));
        assert!(!is_valid_quantity("0"));
        assert!(!is_valid_quantity("-1"));
        assert!(!is_valid_quantity("two"));
    }

    #[test]
    fn test_status_names() {
        let statuses = [UsageStatus::Match, UsageStatus::Overuse, UsageStatus::Underuse];
        let names: Vec<&str> = statuses.iter().map(UsageStatus::as_str).collect();
        assert_eq!(names, ["match", "overuse", "underuse"]);
    }
}
