//! Reporting service: planned-vs-actual ingredient reconciliation and the
//! per-department consumption breakdown

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{
    ActivityService, CatalogService, DailyCalculationService, StockService,
};
use crate::services::daily_calculation::require_date;
use shared::{
    department_activity, merge_requirements, ComparisonRow, DateRange, DepartmentActivity,
    ProductLabel, UsageReport,
};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: sqlx::PgPool,
}

/// Query parameters shared by the report endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub department_id: Option<Uuid>,
    /// "json" (default) or "csv"
    pub format: Option<String>,
}

impl ReportQuery {
    pub fn wants_csv(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("csv"))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientComparisonReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub tolerance_percent: Decimal,
    #[serde(flatten)]
    pub usage: UsageReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentTransfersReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub departments: Vec<DepartmentActivity>,
}

/// Flat CSV rendering of a comparison row
#[derive(Debug, Serialize)]
pub struct ComparisonCsvRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: String,
    pub mixed_units: bool,
    pub required_quantity: Decimal,
    pub required_cost: Decimal,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub transfer_in: Decimal,
    pub transfer_to_trash: Decimal,
    pub transfer_to_used: Decimal,
    pub transfer_out_other: Decimal,
    pub adjustment_in: Decimal,
    pub adjustment_out: Decimal,
    pub total_actual_out: Decimal,
    pub difference: Decimal,
    pub percentage_difference: Decimal,
    pub status: &'static str,
}

impl From<&ComparisonRow> for ComparisonCsvRow {
    fn from(row: &ComparisonRow) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name.clone(),
            unit: row.unit.clone(),
            mixed_units: row.mixed_units,
            required_quantity: row.required_quantity,
            required_cost: row.required_cost,
            total_in: row.usage.total_in,
            total_out: row.usage.total_out,
            transfer_in: row.usage.transfer_in,
            transfer_to_trash: row.usage.transfer_to_trash,
            transfer_to_used: row.usage.transfer_to_used,
            transfer_out_other: row.usage.transfer_out_other,
            adjustment_in: row.usage.adjustment_in,
            adjustment_out: row.usage.adjustment_out,
            total_actual_out: row.total_actual_out,
            difference: row.difference,
            percentage_difference: row.percentage_difference,
            status: row.status.as_str(),
        }
    }
}

/// Flat CSV rendering of one product within one department
#[derive(Debug, Serialize)]
pub struct DepartmentActivityCsvRow {
    pub department_id: Uuid,
    pub department_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: String,
    pub opening_stock: Decimal,
    pub total_in: Decimal,
    pub transfer_in: Decimal,
    pub total_out: Decimal,
    pub transfer_to_trash: Decimal,
    pub transfer_to_used: Decimal,
    pub transfer_out_other: Decimal,
    pub adjustment_in: Decimal,
    pub adjustment_out: Decimal,
    pub closing_stock: Decimal,
    pub consumption: Decimal,
}

pub fn flatten_department_activity(departments: &[DepartmentActivity]) -> Vec<DepartmentActivityCsvRow> {
    departments
        .iter()
        .flat_map(|department| {
            department.products.iter().map(move |p| DepartmentActivityCsvRow {
                department_id: department.department_id,
                department_name: department.department_name.clone(),
                product_id: p.product_id,
                product_name: p.product_name.clone(),
                unit: p.unit.clone(),
                opening_stock: p.opening_stock,
                total_in: p.usage.total_in,
                transfer_in: p.usage.transfer_in,
                total_out: p.usage.total_out,
                transfer_to_trash: p.usage.transfer_to_trash,
                transfer_to_used: p.usage.transfer_to_used,
                transfer_out_other: p.usage.transfer_out_other,
                adjustment_in: p.usage.adjustment_in,
                adjustment_out: p.usage.adjustment_out,
                closing_stock: p.closing_stock,
                consumption: p.consumption,
            })
        })
        .collect()
}

fn required_range(start: Option<&str>, end: Option<&str>) -> AppResult<DateRange> {
    let start = start
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::validation("startDate", "startDate is required"))?;
    let end = end
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::validation("endDate", "endDate is required"))?;
    let range = DateRange::new(require_date(start, "startDate")?, require_date(end, "endDate")?)
        .map_err(|m| AppError::validation("endDate", m))?;
    Ok(range)
}

impl ReportingService {
    pub fn new(db: sqlx::PgPool) -> Self {
        Self { db }
    }

    /// Compare planned ingredient needs against recorded stock outflow
    pub async fn ingredient_comparison(
        &self,
        query: &ReportQuery,
        tolerance: Decimal,
    ) -> AppResult<IngredientComparisonReport> {
        let range = required_range(query.start_date.as_deref(), query.end_date.as_deref())?;
        let catalog = CatalogService::new(self.db.clone());

        let department = match query.department_id {
            Some(id) => Some(catalog.get_department(id).await?),
            None => None,
        };
        let department_name = department.as_ref().map(|d| d.name.clone());

        let snapshots = DailyCalculationService::new(self.db.clone())
            .list_for_department(&range, department_name.as_deref())
            .await?;
        let requirements = merge_requirements(
            snapshots
                .iter()
                .map(|s| s.ingredient_requirements.as_slice()),
        )?;

        let usage = if requirements.is_empty() {
            UsageReport::empty()
        } else {
            let movements = ActivityService::new(self.db.clone())
                .movements_in_range(&requirements.product_ids(), &range, query.department_id)
                .await?;
            let department_names = catalog.department_names().await?;
            let usage = UsageReport::build(&requirements, &movements, &department_names, tolerance);

            tracing::debug!(
                start = %range.start,
                end = %range.end,
                snapshots = snapshots.len(),
                movements = movements.len(),
                overused = usage.summary.overused,
                underused = usage.summary.underused,
                "Ingredient comparison computed"
            );
            usage
        };

        Ok(IngredientComparisonReport {
            start_date: range.start,
            end_date: range.end,
            department_id: query.department_id,
            department_name,
            tolerance_percent: tolerance,
            usage,
        })
    }

    /// Opening stock, movements and closing stock per department and product
    pub async fn department_transfers(&self, query: &ReportQuery) -> AppResult<DepartmentTransfersReport> {
        let start = query
            .start_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::validation("startDate", "startDate is required"))?;
        let start = require_date(start, "startDate")?;
        let end = match query.end_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => require_date(raw, "endDate")?,
            None => Utc::now().date_naive(),
        };
        let range = DateRange::new(start, end).map_err(|m| AppError::validation("endDate", m))?;

        let catalog = CatalogService::new(self.db.clone());
        if let Some(id) = query.department_id {
            catalog.get_department(id).await?;
        }

        let movements = ActivityService::new(self.db.clone())
            .movements_since(range.start_instant(), query.department_id)
            .await?;
        let levels = StockService::new(self.db.clone())
            .current_levels(query.department_id)
            .await?;

        let products: HashMap<Uuid, ProductLabel> = catalog
            .list_products()
            .await?
            .into_iter()
            .map(|p| {
                (
                    p.id,
                    ProductLabel {
                        name: p.name,
                        unit: p.unit,
                    },
                )
            })
            .collect();
        let department_names = catalog.department_names().await?;

        let departments = department_activity(&range, &levels, &movements, &products, &department_names);

        Ok(DepartmentTransfersReport {
            start_date: range.start,
            end_date: range.end,
            departments,
        })
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_range() {
        assert!(required_range(None, Some("2024-01-02")).is_err());
        assert!(required_range(Some("2024-01-01"), None).is_err());
        assert!(required_range(Some(" "), Some("2024-01-02")).is_err());
        assert!(required_range(Some("2024-01-05"), Some("2024-01-02")).is_err());

        let range = required_range(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn test_wants_csv() {
        let mut query = ReportQuery::default();
        assert!(!query.wants_csv());
        query.format = Some("CSV".to_string());
        assert!(query.wants_csv());
        query.format = Some("json".to_string());
        assert!(!query.wants_csv());
    }

    #[test]
    fn test_export_to_csv_writes_header() {
        #[derive(Serialize)]
        struct Row {
            name: &'static str,
            quantity: Decimal,
        }

        let csv = ReportingService::export_to_csv(&[Row {
            name: "Flour",
            quantity: Decimal::new(125, 1),
        }])
        .unwrap();
        assert_eq!(csv, "name,quantity\nFlour,12.5\n");
    }
}
