//! Required vs. actual ingredient usage
//!
//! Compares what the planned recipes say should have been consumed against
//! what the stock movement log shows left each department, and derives
//! opening/closing based consumption per department and product.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregation::RequirementSummary;
use crate::ledger::level_at;
use crate::models::{DestinationCategory, MovementType, StockMovement};
use crate::types::DateRange;

/// Default tolerance band, in percent, inside which usage is a match
pub fn default_tolerance_percent() -> Decimal {
    Decimal::from(15)
}

/// Outcome of comparing required with actual usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Match,
    Overuse,
    Underuse,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Match => "match",
            UsageStatus::Overuse => "overuse",
            UsageStatus::Underuse => "underuse",
        }
    }
}

/// Movement totals bucketed by type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageBuckets {
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub transfer_in: Decimal,
    pub transfer_to_trash: Decimal,
    pub transfer_to_used: Decimal,
    /// transfer_out to ordinary departments; tracked, not counted as usage
    pub transfer_out_other: Decimal,
    pub adjustment_in: Decimal,
    pub adjustment_out: Decimal,
}

impl UsageBuckets {
    pub fn record(
        &mut self,
        movement_type: MovementType,
        category: Option<DestinationCategory>,
        quantity: Decimal,
    ) {
        let bucket = match movement_type {
            MovementType::Entry => &mut self.total_in,
            MovementType::Exit => &mut self.total_out,
            MovementType::TransferIn => &mut self.transfer_in,
            MovementType::TransferOut => match category {
                Some(DestinationCategory::Trash) => &mut self.transfer_to_trash,
                Some(DestinationCategory::Used) => &mut self.transfer_to_used,
                Some(DestinationCategory::Other) | None => &mut self.transfer_out_other,
            },
            MovementType::AdjustmentIn => &mut self.adjustment_in,
            MovementType::AdjustmentOut => &mut self.adjustment_out,
        };
        *bucket = bucket.saturating_add(quantity);
    }

    pub fn record_movement(&mut self, movement: &StockMovement) {
        self.record(
            movement.movement_type,
            movement.destination_category,
            movement.quantity,
        );
    }

    /// Quantity that actually left active inventory
    pub fn total_actual_out(&self) -> Decimal {
        self.total_out
            .saturating_add(self.transfer_to_trash)
            .saturating_add(self.transfer_to_used)
            .saturating_add(self.adjustment_out)
    }

    pub fn absorb(&mut self, other: &UsageBuckets) {
        self.total_in = self.total_in.saturating_add(other.total_in);
        self.total_out = self.total_out.saturating_add(other.total_out);
        self.transfer_in = self.transfer_in.saturating_add(other.transfer_in);
        self.transfer_to_trash = self.transfer_to_trash.saturating_add(other.transfer_to_trash);
        self.transfer_to_used = self.transfer_to_used.saturating_add(other.transfer_to_used);
        self.transfer_out_other = self.transfer_out_other.saturating_add(other.transfer_out_other);
        self.adjustment_in = self.adjustment_in.saturating_add(other.adjustment_in);
        self.adjustment_out = self.adjustment_out.saturating_add(other.adjustment_out);
    }
}

/// Difference between actual and required usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageComparison {
    pub difference: Decimal,
    pub percentage_difference: Decimal,
    pub status: UsageStatus,
}

/// `difference / required × 100`, or 0 when nothing was required.
///
/// Saturates at the decimal bounds when the ratio does not fit.
pub fn percentage_difference(difference: Decimal, required: Decimal) -> Decimal {
    if required.is_zero() {
        return Decimal::ZERO;
    }
    difference
        .checked_div(required)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(if difference.is_sign_negative() == required.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        })
}

pub fn classify_usage(percentage: Decimal, difference: Decimal, tolerance: Decimal) -> UsageStatus {
    if percentage.abs() < tolerance {
        UsageStatus::Match
    } else if difference > Decimal::ZERO {
        UsageStatus::Overuse
    } else {
        UsageStatus::Underuse
    }
}

pub fn compare_usage(required: Decimal, actual_out: Decimal, tolerance: Decimal) -> UsageComparison {
    let difference = actual_out.saturating_sub(required);
    let percentage = percentage_difference(difference, required);
    UsageComparison {
        difference,
        percentage_difference: percentage.round_dp(2),
        status: classify_usage(percentage, difference, tolerance),
    }
}

/// Usage of one product within one department
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentUsage {
    pub department_id: Uuid,
    pub department_name: String,
    #[serde(flatten)]
    pub usage: UsageBuckets,
    pub total_actual_out: Decimal,
}

/// One reconciliation row per required product
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub product_id: Uuid,
    pub product_name: String,
    /// Every unit the product was required in, comma separated
    pub unit: String,
    /// Set when recipes require the product in more than one unit
    pub mixed_units: bool,
    pub required_quantity: Decimal,
    pub required_cost: Decimal,
    #[serde(flatten)]
    pub usage: UsageBuckets,
    pub total_actual_out: Decimal,
    pub difference: Decimal,
    pub percentage_difference: Decimal,
    pub status: UsageStatus,
    pub departments: Vec<DepartmentUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub total_products: usize,
    pub matched: usize,
    pub overused: usize,
    pub underused: usize,
    pub total_required_cost: Decimal,
}

/// Requirement entries of one product, merged across units
struct ProductDemand<'a> {
    product_id: Uuid,
    name: &'a str,
    units: Vec<&'a str>,
    required_quantity: Decimal,
    required_cost: Decimal,
}

/// Collapse `(product, unit)` entries into one demand per product, in order
/// of first appearance. Quantities under different units are summed as
/// recorded; stock is only tracked in one unit per product.
fn demand_per_product(requirements: &RequirementSummary) -> Vec<ProductDemand<'_>> {
    let mut demands: Vec<ProductDemand<'_>> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for requirement in &requirements.ingredients {
        let position = *index.entry(requirement.product_id).or_insert_with(|| {
            demands.push(ProductDemand {
                product_id: requirement.product_id,
                name: &requirement.name,
                units: Vec::new(),
                required_quantity: Decimal::ZERO,
                required_cost: Decimal::ZERO,
            });
            demands.len() - 1
        });
        let demand = &mut demands[position];
        if !demand.units.contains(&requirement.unit.as_str()) {
            demand.units.push(&requirement.unit);
        }
        demand.required_quantity = demand.required_quantity.saturating_add(requirement.required_quantity);
        demand.required_cost = demand.required_cost.saturating_add(requirement.total_price);
    }
    demands
}

/// Build one comparison row per required product.
///
/// `movements` should already be restricted to the report's date range
/// (and department, when scoped); movements for products that are not
/// required are ignored. A product required under several units yields a
/// single row flagged `mixed_units`, so its outflow is counted once.
pub fn reconcile_usage(
    requirements: &RequirementSummary,
    movements: &[StockMovement],
    department_names: &HashMap<Uuid, String>,
    tolerance: Decimal,
) -> Vec<ComparisonRow> {
    let mut per_product: HashMap<Uuid, UsageBuckets> = HashMap::new();
    let mut per_department: HashMap<Uuid, HashMap<Uuid, UsageBuckets>> = HashMap::new();

    for movement in movements {
        per_product
            .entry(movement.product_id)
            .or_default()
            .record_movement(movement);
        per_department
            .entry(movement.product_id)
            .or_default()
            .entry(movement.department_id)
            .or_default()
            .record_movement(movement);
    }

    demand_per_product(requirements)
        .into_iter()
        .map(|demand| {
            let usage = per_product
                .get(&demand.product_id)
                .copied()
                .unwrap_or_default();
            let total_actual_out = usage.total_actual_out();
            let comparison = compare_usage(demand.required_quantity, total_actual_out, tolerance);

            let mut departments: Vec<DepartmentUsage> = per_department
                .get(&demand.product_id)
                .map(|by_department| {
                    by_department
                        .iter()
                        .map(|(department_id, usage)| DepartmentUsage {
                            department_id: *department_id,
                            department_name: department_names
                                .get(department_id)
                                .cloned()
                                .unwrap_or_else(|| "Unknown".to_string()),
                            usage: *usage,
                            total_actual_out: usage.total_actual_out(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            departments.sort_by(|a, b| a.department_name.cmp(&b.department_name));

            ComparisonRow {
                product_id: demand.product_id,
                product_name: demand.name.to_string(),
                unit: demand.units.join(", "),
                mixed_units: demand.units.len() > 1,
                required_quantity: demand.required_quantity,
                required_cost: demand.required_cost,
                usage,
                total_actual_out,
                difference: comparison.difference,
                percentage_difference: comparison.percentage_difference,
                status: comparison.status,
                departments,
            }
        })
        .collect()
}

pub fn summarize_comparison(rows: &[ComparisonRow]) -> ComparisonSummary {
    rows.iter().fold(
        ComparisonSummary {
            total_products: rows.len(),
            ..Default::default()
        },
        |mut summary, row| {
            match row.status {
                UsageStatus::Match => summary.matched += 1,
                UsageStatus::Overuse => summary.overused += 1,
                UsageStatus::Underuse => summary.underused += 1,
            }
            summary.total_required_cost = summary.total_required_cost.saturating_add(row.required_cost);
            summary
        },
    )
}

pub const NO_REQUIREMENTS_MESSAGE: &str = "No ingredient requirements found for the selected period";

/// Comparison rows with their summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub rows: Vec<ComparisonRow>,
    pub summary: ComparisonSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UsageReport {
    /// Report for a period with nothing planned
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            summary: ComparisonSummary::default(),
            message: Some(NO_REQUIREMENTS_MESSAGE.to_string()),
        }
    }

    pub fn build(
        requirements: &RequirementSummary,
        movements: &[StockMovement],
        department_names: &HashMap<Uuid, String>,
        tolerance: Decimal,
    ) -> Self {
        if requirements.is_empty() {
            return Self::empty();
        }
        let rows = reconcile_usage(requirements, movements, department_names, tolerance);
        let summary = summarize_comparison(&rows);
        Self {
            rows,
            summary,
            message: None,
        }
    }
}

/// `opening + entries + transfersIn − closing − transfersToUsed − transfersToTrash`,
/// floored at zero
pub fn consumption(
    opening: Decimal,
    entries: Decimal,
    transfers_in: Decimal,
    closing: Decimal,
    transfers_to_used: Decimal,
    transfers_to_trash: Decimal,
) -> Decimal {
    let consumed = opening
        .saturating_add(entries)
        .saturating_add(transfers_in)
        .saturating_sub(closing)
        .saturating_sub(transfers_to_used)
        .saturating_sub(transfers_to_trash);
    consumed.max(Decimal::ZERO)
}

/// Display data for a product in reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLabel {
    pub name: String,
    pub unit: String,
}

/// Opening/closing reconciliation for one product in one department
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductActivity {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: String,
    pub opening_stock: Decimal,
    #[serde(flatten)]
    pub usage: UsageBuckets,
    pub closing_stock: Decimal,
    pub consumption: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentActivity {
    pub department_id: Uuid,
    pub department_name: String,
    pub products: Vec<ProductActivity>,
    pub totals: UsageBuckets,
    pub total_consumption: Decimal,
}

/// Per-department, per-product movement breakdown for a date range.
///
/// `current_levels` maps `(product, department)` to today's quantity and
/// `movements_since_start` holds every movement recorded at or after the
/// range start, including those after the range end; those are used to
/// roll current levels back to the opening and closing instants.
pub fn department_activity(
    range: &DateRange,
    current_levels: &HashMap<(Uuid, Uuid), Decimal>,
    movements_since_start: &[StockMovement],
    products: &HashMap<Uuid, ProductLabel>,
    departments: &HashMap<Uuid, String>,
) -> Vec<DepartmentActivity> {
    let start = range.start_instant();
    let end = range.end_exclusive();

    let mut since_start: HashMap<(Uuid, Uuid), Vec<(MovementType, Decimal)>> = HashMap::new();
    let mut after_end: HashMap<(Uuid, Uuid), Vec<(MovementType, Decimal)>> = HashMap::new();
    let mut in_range: HashMap<(Uuid, Uuid), UsageBuckets> = HashMap::new();

    for movement in movements_since_start.iter().filter(|m| m.created_at >= start) {
        let key = (movement.product_id, movement.department_id);
        let effect = (movement.movement_type, movement.quantity);
        since_start.entry(key).or_default().push(effect);
        if movement.created_at >= end {
            after_end.entry(key).or_default().push(effect);
        } else {
            in_range.entry(key).or_default().record_movement(movement);
        }
    }

    let mut by_department: HashMap<Uuid, Vec<ProductActivity>> = HashMap::new();
    for (&(product_id, department_id), usage) in &in_range {
        let current = current_levels
            .get(&(product_id, department_id))
            .copied()
            .unwrap_or(Decimal::ZERO);
        let key = (product_id, department_id);
        let opening = level_at(current, since_start.get(&key).cloned().unwrap_or_default());
        let closing = level_at(current, after_end.get(&key).cloned().unwrap_or_default());
        let label = products.get(&product_id);

        by_department
            .entry(department_id)
            .or_default()
            .push(ProductActivity {
                product_id,
                product_name: label.map(|l| l.name.clone()).unwrap_or_default(),
                unit: label.map(|l| l.unit.clone()).unwrap_or_default(),
                opening_stock: opening,
                usage: *usage,
                closing_stock: closing,
                consumption: consumption(
                    opening,
                    usage.total_in,
                    usage.transfer_in,
                    closing,
                    usage.transfer_to_used,
                    usage.transfer_to_trash,
                ),
            });
    }

    let mut report: Vec<DepartmentActivity> = by_department
        .into_iter()
        .map(|(department_id, mut products)| {
            products.sort_by(|a, b| a.product_name.cmp(&b.product_name));
            let mut totals = UsageBuckets::default();
            for p in &products {
                totals.absorb(&p.usage);
            }
            let total_consumption = products.iter().map(|p| p.consumption).sum();
            DepartmentActivity {
                department_id,
                department_name: departments
                    .get(&department_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                products,
                totals,
                total_consumption,
            }
        })
        .collect();
    report.sort_by(|a, b| a.department_name.cmp(&b.department_name));
    report
}
