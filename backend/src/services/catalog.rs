//! Catalog service for products and departments

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{ActivityAction, Department, EntityType, Product};
use crate::services::ActivityService;
use shared::{validate_barcode, validate_name, validate_non_negative, validate_unit, ProductSnapshot};

/// Catalog service for managing products and departments
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub barcode: Option<String>,
    #[validate(length(min = 1, max = 32, message = "Unit is required"))]
    pub unit: String,
    pub min_stock: Option<Decimal>,
    pub price: Decimal,
}

/// Input for updating a product
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub barcode: Option<String>,
    #[validate(length(min = 1, max = 32, message = "Unit cannot be empty"))]
    pub unit: Option<String>,
    pub min_stock: Option<Decimal>,
    pub price: Option<Decimal>,
}

/// Input for creating or updating a department
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    barcode: Option<String>,
    unit: String,
    min_stock: Decimal,
    price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            barcode: row.barcode,
            unit: row.unit,
            min_stock: row.min_stock,
            price: row.price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DepartmentRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Department {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, barcode, unit, min_stock, price, created_at, updated_at";
const DEPARTMENT_COLUMNS: &str = "id, name, description, created_at, updated_at";

fn check_amounts(min_stock: Option<Decimal>, price: Option<Decimal>) -> AppResult<()> {
    if let Some(min_stock) = min_stock {
        validate_non_negative(min_stock).map_err(|m| AppError::validation("minStock", m))?;
    }
    if let Some(price) = price {
        validate_non_negative(price).map_err(|m| AppError::validation("price", m))?;
    }
    Ok(())
}

/// Names and units must have visible content once trimmed
fn check_labels(name: Option<&str>, unit: Option<&str>) -> AppResult<()> {
    if let Some(name) = name {
        validate_name(name).map_err(|m| AppError::validation("name", m))?;
    }
    if let Some(unit) = unit {
        validate_unit(unit).map_err(|m| AppError::validation("unit", m))?;
    }
    Ok(())
}

fn normalize_barcode(barcode: Option<String>) -> AppResult<Option<String>> {
    match barcode.map(|b| b.trim().to_string()) {
        None => Ok(None),
        Some(b) if b.is_empty() => Ok(None),
        Some(b) => {
            validate_barcode(&b).map_err(|m| AppError::validation("barcode", m))?;
            Ok(Some(b))
        }
    }
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Products
    // ========================================================================

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Name, unit and price for each of `ids` that exists, in one query
    pub async fn product_snapshots(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, ProductSnapshot>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (Uuid, String, String, Decimal)>(
            "SELECT id, name, unit, price FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, unit, price)| {
                (
                    id,
                    ProductSnapshot {
                        id,
                        name,
                        unit,
                        price,
                    },
                )
            })
            .collect())
    }

    pub async fn create_product(&self, user_id: Uuid, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;
        check_labels(Some(&input.name), Some(&input.unit))?;
        check_amounts(input.min_stock, Some(input.price))?;
        let barcode = normalize_barcode(input.barcode)?;
        self.ensure_barcode_free(barcode.as_deref(), None).await?;

        let product: Product = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, barcode, unit, min_stock, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&barcode)
        .bind(input.unit.trim())
        .bind(input.min_stock.unwrap_or(Decimal::ZERO))
        .bind(input.price)
        .fetch_one(&self.db)
        .await?
        .into();

        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                ActivityAction::Create,
                EntityType::Product,
                product.id,
                json!(product),
            )
            .await;

        Ok(product)
    }

    pub async fn update_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;
        check_labels(input.name.as_deref(), input.unit.as_deref())?;
        check_amounts(input.min_stock, input.price)?;

        let existing = self.get_product(product_id).await?;

        let barcode = match input.barcode {
            Some(b) => normalize_barcode(Some(b))?,
            None => existing.barcode.clone(),
        };
        self.ensure_barcode_free(barcode.as_deref(), Some(product_id)).await?;

        let updated: Product = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = $1, barcode = $2, unit = $3, min_stock = $4, price = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(input.name.as_deref().map(str::trim).unwrap_or(&existing.name))
        .bind(&barcode)
        .bind(input.unit.as_deref().map(str::trim).unwrap_or(&existing.unit))
        .bind(input.min_stock.unwrap_or(existing.min_stock))
        .bind(input.price.unwrap_or(existing.price))
        .bind(product_id)
        .fetch_one(&self.db)
        .await?
        .into();

        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                ActivityAction::Update,
                EntityType::Product,
                product_id,
                json!({ "old": existing, "new": updated }),
            )
            .await;

        Ok(updated)
    }

    /// Delete a product that no stock row references
    pub async fn delete_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let existing = self.get_product(product_id).await?;

        let stock_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stocks WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(&self.db)
                .await?;

        if stock_count > 0 {
            return Err(AppError::conflict(
                "product",
                format!("Cannot delete product: {} stock records reference it", stock_count),
            ));
        }

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;

        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                ActivityAction::Delete,
                EntityType::Product,
                product_id,
                json!(existing),
            )
            .await;

        Ok(())
    }

    async fn ensure_barcode_free(&self, barcode: Option<&str>, except: Option<Uuid>) -> AppResult<()> {
        let Some(barcode) = barcode else {
            return Ok(());
        };

        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE barcode = $1 AND ($2::uuid IS NULL OR id != $2)",
        )
        .bind(barcode)
        .bind(except)
        .fetch_one(&self.db)
        .await?;

        if taken > 0 {
            return Err(AppError::conflict(
                "barcode",
                "A product with this barcode already exists",
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Departments
    // ========================================================================

    pub async fn list_departments(&self) -> AppResult<Vec<Department>> {
        let rows = sqlx::query_as::<_, DepartmentRow>(&format!(
            "SELECT {} FROM departments ORDER BY name",
            DEPARTMENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Department::from).collect())
    }

    pub async fn get_department(&self, department_id: Uuid) -> AppResult<Department> {
        sqlx::query_as::<_, DepartmentRow>(&format!(
            "SELECT {} FROM departments WHERE id = $1",
            DEPARTMENT_COLUMNS
        ))
        .bind(department_id)
        .fetch_optional(&self.db)
        .await?
        .map(Department::from)
        .ok_or_else(|| AppError::NotFound("Department".to_string()))
    }

    /// Case-insensitive lookup by name
    pub async fn find_department_by_name(&self, name: &str) -> AppResult<Option<Department>> {
        let row = sqlx::query_as::<_, DepartmentRow>(&format!(
            "SELECT {} FROM departments WHERE LOWER(name) = LOWER($1)",
            DEPARTMENT_COLUMNS
        ))
        .bind(name.trim())
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Department::from))
    }

    pub async fn get_department_by_name(&self, name: &str) -> AppResult<Department> {
        self.find_department_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Department '{}'", name.trim())))
    }

    /// Fetch a sink department (Trash/Used), creating it on first use
    pub async fn ensure_sink_department(&self, name: &str) -> AppResult<Department> {
        if let Some(department) = self.find_department_by_name(name).await? {
            return Ok(department);
        }

        sqlx::query(
            r#"
            INSERT INTO departments (name, description)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(format!("{} sink department", name))
        .execute(&self.db)
        .await?;

        tracing::info!(department = name, "Created sink department");
        self.get_department_by_name(name).await
    }

    /// `id → name` for every department
    pub async fn department_names(&self) -> AppResult<HashMap<Uuid, String>> {
        let rows = sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM departments")
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn create_department(&self, user_id: Uuid, input: DepartmentInput) -> AppResult<Department> {
        input.validate()?;
        check_labels(Some(&input.name), None)?;
        let name = input.name.trim();
        self.ensure_department_name_free(name, None).await?;

        let department: Department = sqlx::query_as::<_, DepartmentRow>(&format!(
            r#"
            INSERT INTO departments (name, description)
            VALUES ($1, $2)
            RETURNING {}
            "#,
            DEPARTMENT_COLUMNS
        ))
        .bind(name)
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?
        .into();

        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                ActivityAction::Create,
                EntityType::Department,
                department.id,
                json!(department),
            )
            .await;

        Ok(department)
    }

    pub async fn update_department(
        &self,
        user_id: Uuid,
        department_id: Uuid,
        input: DepartmentInput,
    ) -> AppResult<Department> {
        input.validate()?;
        check_labels(Some(&input.name), None)?;
        let existing = self.get_department(department_id).await?;
        let name = input.name.trim();

        if existing.is_sink() && !existing.name.eq_ignore_ascii_case(name) {
            return Err(AppError::validation("name", "Sink departments cannot be renamed"));
        }
        self.ensure_department_name_free(name, Some(department_id)).await?;

        let updated: Department = sqlx::query_as::<_, DepartmentRow>(&format!(
            r#"
            UPDATE departments
            SET name = $1, description = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            DEPARTMENT_COLUMNS
        ))
        .bind(name)
        .bind(input.description.as_ref().or(existing.description.as_ref()))
        .bind(department_id)
        .fetch_one(&self.db)
        .await?
        .into();

        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                ActivityAction::Update,
                EntityType::Department,
                department_id,
                json!({ "old": existing, "new": updated }),
            )
            .await;

        Ok(updated)
    }

    pub async fn delete_department(&self, user_id: Uuid, department_id: Uuid) -> AppResult<()> {
        let existing = self.get_department(department_id).await?;

        let stock_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stocks WHERE department_id = $1")
                .bind(department_id)
                .fetch_one(&self.db)
                .await?;

        if stock_count > 0 {
            return Err(AppError::conflict(
                "department",
                format!("Cannot delete department: {} stock records reference it", stock_count),
            ));
        }

        sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(department_id)
            .execute(&self.db)
            .await?;

        ActivityService::new(self.db.clone())
            .log_activity(
                user_id,
                ActivityAction::Delete,
                EntityType::Department,
                department_id,
                json!(existing),
            )
            .await;

        Ok(())
    }

    async fn ensure_department_name_free(&self, name: &str, except: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM departments WHERE LOWER(name) = LOWER($1) AND ($2::uuid IS NULL OR id != $2)",
        )
        .bind(name)
        .bind(except)
        .fetch_one(&self.db)
        .await?;

        if taken > 0 {
            return Err(AppError::conflict(
                "department",
                "A department with this name already exists",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_labels_are_rejected() {
        assert!(check_labels(Some("Flour"), Some("kg")).is_ok());
        assert!(check_labels(None, None).is_ok());
        assert!(matches!(
            check_labels(Some("   "), Some("kg")),
            Err(AppError::Validation { field, .. }) if field == "name"
        ));
        assert!(matches!(
            check_labels(Some("Flour"), Some(" ")),
            Err(AppError::Validation { field, .. }) if field == "unit"
        ));
    }

    #[test]
    fn test_amounts_may_be_zero_but_not_negative() {
        assert!(check_amounts(Some(Decimal::ZERO), Some(Decimal::ZERO)).is_ok());
        assert!(check_amounts(Some(Decimal::from(-1)), None).is_err());
        assert!(check_amounts(None, Some(Decimal::new(-1, 2))).is_err());
    }

    #[test]
    fn test_blank_barcode_is_dropped() {
        assert_eq!(normalize_barcode(Some("  ".to_string())).unwrap(), None);
        assert_eq!(
            normalize_barcode(Some(" 4006381333931 ".to_string())).unwrap(),
            Some("4006381333931".to_string())
        );
        assert!(normalize_barcode(Some("40 06".to_string())).is_err());
    }
}
