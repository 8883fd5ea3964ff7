//! Usage reconciliation tests
//!
//! Tests for planned-vs-actual ingredient usage including:
//! - zero requirement reports 0% instead of failing
//! - status is `match` exactly when |percentage| is inside the tolerance band
//! - trash and used transfers count as usage, ordinary transfers do not

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    compare_usage, consumption, default_tolerance_percent, reconcile_usage, snapshots_for_department,
    summarize_comparison, CalculationInput, ComparisonSummary, DailyCalculation, DestinationCategory,
    IngredientRequirement, MovementType, RequirementSummary, StockMovement, UsageBuckets,
    UsageReport, UsageStatus,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn movement(
    product_id: Uuid,
    department_id: Uuid,
    movement_type: MovementType,
    destination_category: Option<DestinationCategory>,
    quantity: &str,
) -> StockMovement {
    StockMovement {
        id: Uuid::new_v4(),
        product_id,
        department_id,
        quantity: dec(quantity),
        movement_type,
        destination_category,
        reference: "test".to_string(),
        related_document: None,
        related_document_type: None,
        user_id: Uuid::nil(),
        created_at: NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc(),
    }
}

fn requirement(product_id: Uuid, name: &str, quantity: &str, cost: &str) -> RequirementSummary {
    RequirementSummary {
        ingredients: vec![IngredientRequirement {
            product_id,
            name: name.to_string(),
            unit: "kg".to_string(),
            required_quantity: dec(quantity),
            total_price: dec(cost),
        }],
        total_cost: dec(cost),
    }
}

fn snapshot(day: u32, recipes: &[Uuid]) -> DailyCalculation {
    let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
    let at = date.and_hms_opt(8, 0, 0).unwrap().and_utc();
    DailyCalculation {
        id: Uuid::new_v4(),
        date,
        calculations: recipes
            .iter()
            .map(|recipe| CalculationInput {
                recipe: *recipe,
                quantity: dec("1"),
            })
            .collect(),
        ingredient_requirements: Vec::new(),
        total_cost: Decimal::ZERO,
        created_at: at,
        updated_at: at,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_exit_and_trash_within_tolerance() {
        let flour = Uuid::new_v4();
        let kitchen = Uuid::new_v4();
        let names = HashMap::from([(kitchen, "Kitchen".to_string())]);

        let rows = reconcile_usage(
            &requirement(flour, "Flour", "100", "120"),
            &[
                movement(flour, kitchen, MovementType::Exit, None, "90"),
                movement(flour, kitchen, MovementType::TransferOut, Some(DestinationCategory::Trash), "5"),
            ],
            &names,
            default_tolerance_percent(),
        );

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.total_actual_out, dec("95"));
        assert_eq!(row.difference, dec("-5"));
        assert_eq!(row.percentage_difference, dec("-5"));
        assert_eq!(row.status, UsageStatus::Match);
        assert_eq!(row.departments.len(), 1);
        assert_eq!(row.departments[0].department_name, "Kitchen");
    }

    #[test]
    fn test_half_usage_is_underuse() {
        let flour = Uuid::new_v4();
        let kitchen = Uuid::new_v4();

        let rows = reconcile_usage(
            &requirement(flour, "Flour", "100", "120"),
            &[movement(flour, kitchen, MovementType::Exit, None, "50")],
            &HashMap::new(),
            default_tolerance_percent(),
        );

        assert_eq!(rows[0].percentage_difference, dec("-50"));
        assert_eq!(rows[0].status, UsageStatus::Underuse);
        assert_eq!(rows[0].departments[0].department_name, "Unknown");
    }

    #[test]
    fn test_overuse_counts_used_and_adjustments() {
        let flour = Uuid::new_v4();
        let kitchen = Uuid::new_v4();

        let rows = reconcile_usage(
            &requirement(flour, "Flour", "10", "12"),
            &[
                movement(flour, kitchen, MovementType::Exit, None, "8"),
                movement(flour, kitchen, MovementType::TransferOut, Some(DestinationCategory::Used), "3"),
                movement(flour, kitchen, MovementType::AdjustmentOut, None, "1"),
                movement(flour, kitchen, MovementType::AdjustmentIn, None, "4"),
            ],
            &HashMap::new(),
            default_tolerance_percent(),
        );

        let row = &rows[0];
        assert_eq!(row.total_actual_out, dec("12"));
        assert_eq!(row.usage.adjustment_in, dec("4"));
        assert_eq!(row.percentage_difference, dec("20"));
        assert_eq!(row.status, UsageStatus::Overuse);
    }

    #[test]
    fn test_ordinary_transfer_is_not_usage() {
        let flour = Uuid::new_v4();
        let store = Uuid::new_v4();

        let rows = reconcile_usage(
            &requirement(flour, "Flour", "10", "12"),
            &[movement(flour, store, MovementType::TransferOut, Some(DestinationCategory::Other), "10")],
            &HashMap::new(),
            default_tolerance_percent(),
        );

        assert_eq!(rows[0].usage.transfer_out_other, dec("10"));
        assert_eq!(rows[0].total_actual_out, Decimal::ZERO);
        assert_eq!(rows[0].status, UsageStatus::Underuse);
    }

    #[test]
    fn test_unrequired_products_are_ignored() {
        let flour = Uuid::new_v4();
        let salt = Uuid::new_v4();
        let kitchen = Uuid::new_v4();

        let rows = reconcile_usage(
            &requirement(flour, "Flour", "10", "12"),
            &[movement(salt, kitchen, MovementType::Exit, None, "3")],
            &HashMap::new(),
            default_tolerance_percent(),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, flour);
        assert_eq!(rows[0].total_actual_out, Decimal::ZERO);
    }

    #[test]
    fn test_zero_requirement_is_zero_percent() {
        let comparison = compare_usage(Decimal::ZERO, dec("7"), default_tolerance_percent());
        assert_eq!(comparison.percentage_difference, Decimal::ZERO);
        assert_eq!(comparison.difference, dec("7"));
        assert_eq!(comparison.status, UsageStatus::Match);
    }

    #[test]
    fn test_percentage_rounded_to_two_places() {
        let comparison = compare_usage(dec("3"), dec("4"), default_tolerance_percent());
        assert_eq!(comparison.percentage_difference, dec("33.33"));
        assert_eq!(comparison.status, UsageStatus::Overuse);
    }

    #[test]
    fn test_summary_totals() {
        let flour = Uuid::new_v4();
        let kitchen = Uuid::new_v4();
        let rows = reconcile_usage(
            &requirement(flour, "Flour", "100", "120"),
            &[movement(flour, kitchen, MovementType::Exit, None, "100")],
            &HashMap::new(),
            default_tolerance_percent(),
        );

        let summary = summarize_comparison(&rows);
        assert_eq!(summary.total_products, 1);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.overused + summary.underused, 0);
        assert_eq!(summary.total_required_cost, dec("120"));
    }

    #[test]
    fn test_consumption_formula() {
        // 30 + 10 + 5 − 20 − 2 − 1
        assert_eq!(
            consumption(dec("30"), dec("10"), dec("5"), dec("20"), dec("2"), dec("1")),
            dec("22")
        );
        assert_eq!(
            consumption(dec("0"), dec("0"), dec("0"), dec("5"), dec("0"), dec("0")),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_one_product_in_two_units_counts_outflow_once() {
        let salt = Uuid::new_v4();
        let kitchen = Uuid::new_v4();
        let mut requirements = requirement(salt, "Salt", "50", "10");
        requirements.ingredients.push(IngredientRequirement {
            product_id: salt,
            name: "Salt".to_string(),
            unit: "g".to_string(),
            required_quantity: dec("50"),
            total_price: dec("10"),
        });

        let rows = reconcile_usage(
            &requirements,
            &[movement(salt, kitchen, MovementType::Exit, None, "100")],
            &HashMap::new(),
            default_tolerance_percent(),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_actual_out, dec("100"));
        assert_eq!(rows[0].required_quantity, dec("100"));
        assert!(rows[0].mixed_units);
        assert_eq!(rows[0].status, UsageStatus::Match);

        let summary = summarize_comparison(&rows);
        assert_eq!(summary.total_products, 1);
        assert_eq!(summary.total_required_cost, dec("20"));
    }

    #[test]
    fn test_empty_period_report_explains_itself() {
        let report = UsageReport::build(
            &RequirementSummary::default(),
            &[movement(Uuid::new_v4(), Uuid::new_v4(), MovementType::Exit, None, "5")],
            &HashMap::new(),
            default_tolerance_percent(),
        );

        assert!(report.rows.is_empty());
        assert_eq!(report.summary, ComparisonSummary::default());
        assert_eq!(
            report.message.as_deref(),
            Some("No ingredient requirements found for the selected period")
        );
    }

    #[test]
    fn test_report_with_requirements_has_no_message() {
        let flour = Uuid::new_v4();
        let report = UsageReport::build(
            &requirement(flour, "Flour", "10", "12"),
            &[],
            &HashMap::new(),
            default_tolerance_percent(),
        );

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.summary.underused, 1);
        assert_eq!(report.message, None);
    }

    #[test]
    fn test_snapshots_scoped_to_owning_department() {
        let bread = Uuid::new_v4();
        let latte = Uuid::new_v4();
        let deleted = Uuid::new_v4();
        let owners = HashMap::from([
            (bread, "Bakery".to_string()),
            (latte, "Bar".to_string()),
        ]);
        let snapshots = vec![
            snapshot(1, &[bread]),
            snapshot(2, &[latte]),
            snapshot(3, &[latte, bread]),
            snapshot(4, &[deleted]),
            snapshot(5, &[]),
        ];

        let bakery = snapshots_for_department(snapshots.clone(), &owners, "bakery");
        let days: Vec<u32> = bakery.iter().map(|s| s.date.day()).collect();
        assert_eq!(days, vec![1, 3]);

        let bar = snapshots_for_department(snapshots.clone(), &owners, "Bar");
        assert_eq!(bar.len(), 2);

        assert!(snapshots_for_department(snapshots, &owners, "Pastry").is_empty());
    }

    #[test]
    fn test_bucket_recording() {
        let mut buckets = UsageBuckets::default();
        buckets.record(MovementType::Entry, None, dec("10"));
        buckets.record(MovementType::TransferIn, Some(DestinationCategory::Other), dec("4"));
        buckets.record(MovementType::TransferOut, None, dec("2"));
        buckets.record(MovementType::TransferOut, Some(DestinationCategory::Trash), dec("1"));

        assert_eq!(buckets.total_in, dec("10"));
        assert_eq!(buckets.transfer_in, dec("4"));
        assert_eq!(buckets.transfer_out_other, dec("2"));
        assert_eq!(buckets.transfer_to_trash, dec("1"));
        assert_eq!(buckets.total_actual_out(), dec("1"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_match_iff_inside_tolerance(
            required in 1i64..100_000,
            actual in 0i64..200_000,
            tolerance in 1i64..50,
        ) {
            let required = Decimal::new(required, 2);
            let actual = Decimal::new(actual, 2);
            let tolerance = Decimal::from(tolerance);

            let comparison = compare_usage(required, actual, tolerance);
            let difference = actual - required;
            let percentage = difference / required * Decimal::ONE_HUNDRED;

            prop_assert_eq!(comparison.difference, difference);
            prop_assert_eq!(comparison.status == UsageStatus::Match, percentage.abs() < tolerance);
            if comparison.status == UsageStatus::Overuse {
                prop_assert!(difference > Decimal::ZERO);
            }
            if comparison.status == UsageStatus::Underuse {
                prop_assert!(difference <= Decimal::ZERO);
            }
        }

        #[test]
        fn prop_zero_requirement_never_divides(actual in 0i64..1_000_000) {
            let comparison = compare_usage(Decimal::ZERO, Decimal::new(actual, 2), default_tolerance_percent());
            prop_assert_eq!(comparison.percentage_difference, Decimal::ZERO);
        }

        #[test]
        fn prop_consumption_never_negative(
            opening in 0i64..1000,
            entries in 0i64..1000,
            transfers_in in 0i64..1000,
            closing in 0i64..3000,
            used in 0i64..1000,
            trash in 0i64..1000,
        ) {
            let consumed = consumption(
                Decimal::from(opening),
                Decimal::from(entries),
                Decimal::from(transfers_in),
                Decimal::from(closing),
                Decimal::from(used),
                Decimal::from(trash),
            );
            prop_assert!(consumed >= Decimal::ZERO);
        }
    }
}
