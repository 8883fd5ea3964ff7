//! Stock ledger service
//!
//! Quantity changes run inside one database transaction per request.
//! Decrements are conditional updates (`quantity >= n`), so two requests
//! racing on the same row cannot drive it negative. Movement and audit
//! records are appended after commit and are best-effort.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ActivityAction, Department, DestinationCategory, EntityType, MovementType, Product,
    RelatedDocumentType, Stock, TRASH_DEPARTMENT, USED_DEPARTMENT,
};
use crate::services::activity::NewMovement;
use crate::services::{ActivityService, CatalogService};
use shared::{
    check_withdrawal, plan_adjustment, validate_positive_quantity, InsufficientStock, TransferOutcome,
};

/// Stock service for ledger mutations and stock queries
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Product named by id or, failing that, by exact name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub product_id: Option<Uuid>,
    #[serde(alias = "product_name")]
    pub product_name: Option<String>,
}

/// Input for receiving stock into a department
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStockInput {
    #[serde(flatten)]
    pub product: ProductRef,
    pub department: String,
    pub quantity: Decimal,
    pub reference: Option<String>,
}

/// Input for moving stock between two departments
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    #[serde(flatten)]
    pub product: ProductRef,
    #[serde(alias = "from_department")]
    pub from_department: String,
    #[serde(alias = "to_department")]
    pub to_department: String,
    pub quantity: Decimal,
    pub reference: Option<String>,
}

/// Input for moving stock to the Trash or Used sink
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkTransferInput {
    #[serde(flatten)]
    pub product: ProductRef,
    #[serde(alias = "from_department", alias = "department")]
    pub from_department: String,
    pub quantity: Decimal,
    pub reference: Option<String>,
}

/// Input for recording stock that left a department
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveStockInput {
    #[serde(flatten)]
    pub product: ProductRef,
    pub department: String,
    pub quantity: Decimal,
    pub reference: Option<String>,
}

/// Input for setting a stock row to an explicit quantity
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockInput {
    #[serde(flatten)]
    pub product: ProductRef,
    pub department: String,
    pub quantity: Decimal,
    pub reason: Option<String>,
}

/// Result of a transfer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub product_id: Uuid,
    pub product_name: String,
    pub from_department: String,
    pub to_department: String,
    pub destination_category: DestinationCategory,
    pub reference: String,
    #[serde(flatten)]
    pub outcome: TransferOutcome,
}

/// Result of an adjustment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentSummary {
    pub stock: Stock,
    pub previous_quantity: Decimal,
    pub movement_type: Option<MovementType>,
    pub difference: Decimal,
    pub reason: String,
}

/// Stock row joined with its product and department
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: String,
    pub department_id: Uuid,
    pub department_name: String,
    pub quantity: Decimal,
    pub min_stock: Decimal,
    pub price: Decimal,
    pub value: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentValue {
    pub department_id: Uuid,
    pub department_name: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockValuation {
    pub total_value: Decimal,
    pub departments: Vec<DepartmentValue>,
}

#[derive(Debug, FromRow)]
struct StockRow {
    id: Uuid,
    product_id: Uuid,
    department_id: Uuid,
    quantity: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StockRow> for Stock {
    fn from(row: StockRow) -> Self {
        Stock {
            id: row.id,
            product_id: row.product_id,
            department_id: row.department_id,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const STOCK_COLUMNS: &str = "id, product_id, department_id, quantity, created_at, updated_at";

const STOCK_VIEW_QUERY: &str = r#"
    SELECT s.id, s.product_id, p.name AS product_name, p.unit,
           s.department_id, d.name AS department_name,
           s.quantity, p.min_stock, p.price, s.quantity * p.price AS value, s.updated_at
    FROM stocks s
    JOIN products p ON p.id = s.product_id
    JOIN departments d ON d.id = s.department_id
"#;

fn check_quantity(quantity: Decimal) -> AppResult<()> {
    validate_positive_quantity(quantity).map_err(|m| AppError::validation("quantity", m))
}

fn reference_or(reference: Option<String>, fallback: impl FnOnce() -> String) -> String {
    reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(fallback)
}

/// Subtract `quantity` from a stock row, refusing to go below zero
async fn withdraw(
    tx: &mut Transaction<'_, Postgres>,
    product: &Product,
    department_id: Uuid,
    quantity: Decimal,
) -> AppResult<(Uuid, Decimal)> {
    let updated = sqlx::query_as::<_, (Uuid, Decimal)>(
        r#"
        UPDATE stocks
        SET quantity = quantity - $3, updated_at = NOW()
        WHERE product_id = $1 AND department_id = $2 AND quantity >= $3
        RETURNING id, quantity
        "#,
    )
    .bind(product.id)
    .bind(department_id)
    .bind(quantity)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(row) = updated {
        return Ok(row);
    }

    let available = sqlx::query_scalar::<_, Decimal>(
        "SELECT quantity FROM stocks WHERE product_id = $1 AND department_id = $2",
    )
    .bind(product.id)
    .bind(department_id)
    .fetch_optional(&mut **tx)
    .await?
    .unwrap_or(Decimal::ZERO);

    let shortfall = match check_withdrawal(available, quantity) {
        Err(shortfall) => shortfall,
        // Row vanished between the two statements
        Ok(_) => InsufficientStock {
            available: Decimal::ZERO,
            requested: quantity,
        },
    };
    Err(AppError::insufficient_stock(&product.name, shortfall))
}

/// Add `quantity` to a stock row, creating it if needed.
/// Returns the row id, new quantity and whether the row was created.
async fn deposit(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    department_id: Uuid,
    quantity: Decimal,
) -> AppResult<(Uuid, Decimal, bool)> {
    let row = sqlx::query_as::<_, (Uuid, Decimal, bool)>(
        r#"
        INSERT INTO stocks (product_id, department_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (product_id, department_id) DO UPDATE
        SET quantity = stocks.quantity + EXCLUDED.quantity, updated_at = NOW()
        RETURNING id, quantity, (xmax = 0) AS created
        "#,
    )
    .bind(product_id)
    .bind(department_id)
    .bind(quantity)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db.clone())
    }

    fn activity(&self) -> ActivityService {
        ActivityService::new(self.db.clone())
    }

    async fn resolve_product(&self, product: &ProductRef) -> AppResult<Product> {
        if let Some(id) = product.product_id {
            return self.catalog().get_product(id).await;
        }

        let name = product
            .product_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::validation("productId", "productId or productName is required"))?;

        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM products WHERE LOWER(name) = LOWER($1) ORDER BY created_at LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product '{}'", name)))?;

        self.catalog().get_product(id).await
    }

    async fn get_stock(&self, stock_id: Uuid) -> AppResult<Stock> {
        sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {} FROM stocks WHERE id = $1",
            STOCK_COLUMNS
        ))
        .bind(stock_id)
        .fetch_optional(&self.db)
        .await?
        .map(Stock::from)
        .ok_or_else(|| AppError::NotFound("Stock".to_string()))
    }

    // ========================================================================
    // Ledger operations
    // ========================================================================

    /// Receive stock into a department (`entry` movement)
    pub async fn add_stock(&self, user_id: Uuid, input: AddStockInput) -> AppResult<Stock> {
        check_quantity(input.quantity)?;
        let product = self.resolve_product(&input.product).await?;
        let department = self.catalog().get_department_by_name(&input.department).await?;

        let mut tx = self.db.begin().await?;
        let (stock_id, new_quantity, created) =
            deposit(&mut tx, product.id, department.id, input.quantity).await?;
        tx.commit().await?;

        let reference = reference_or(input.reference, || {
            format!("Stock entry to {}", department.name)
        });

        tracing::info!(
            product = %product.name,
            department = %department.name,
            quantity = %input.quantity,
            new_quantity = %new_quantity,
            "Stock added"
        );

        let activity = self.activity();
        activity
            .log_stock_movement(&NewMovement {
                product_id: product.id,
                department_id: department.id,
                quantity: input.quantity,
                movement_type: MovementType::Entry,
                destination_category: None,
                reference: reference.clone(),
                related_document: Some(stock_id),
                related_document_type: Some(RelatedDocumentType::Stock),
                user_id,
            })
            .await;

        let (action, changes) = if created {
            (
                ActivityAction::Create,
                json!({
                    "productId": product.id,
                    "department": department.name,
                    "quantity": new_quantity,
                }),
            )
        } else {
            (
                ActivityAction::Update,
                json!({
                    "productId": product.id,
                    "department": department.name,
                    "oldQuantity": new_quantity - input.quantity,
                    "newQuantity": new_quantity,
                    "reference": reference,
                }),
            )
        };
        activity
            .log_activity(user_id, action, EntityType::Stock, stock_id, changes)
            .await;

        self.get_stock(stock_id).await
    }

    /// Move stock between two departments
    pub async fn transfer(&self, user_id: Uuid, input: TransferInput) -> AppResult<TransferSummary> {
        check_quantity(input.quantity)?;
        let product = self.resolve_product(&input.product).await?;
        let source = self.catalog().get_department_by_name(&input.from_department).await?;
        let destination = if shared::is_sink_name(&input.to_department) {
            self.catalog().ensure_sink_department(input.to_department.trim()).await?
        } else {
            self.catalog().get_department_by_name(&input.to_department).await?
        };

        self.move_between(user_id, &product, &source, &destination, input.quantity, input.reference)
            .await
    }

    /// Dispose of stock into the Trash sink
    pub async fn transfer_to_trash(&self, user_id: Uuid, input: SinkTransferInput) -> AppResult<TransferSummary> {
        self.transfer_to_sink(user_id, TRASH_DEPARTMENT, input).await
    }

    /// Record stock as consumed into the Used sink
    pub async fn transfer_to_used(&self, user_id: Uuid, input: SinkTransferInput) -> AppResult<TransferSummary> {
        self.transfer_to_sink(user_id, USED_DEPARTMENT, input).await
    }

    async fn transfer_to_sink(
        &self,
        user_id: Uuid,
        sink: &str,
        input: SinkTransferInput,
    ) -> AppResult<TransferSummary> {
        check_quantity(input.quantity)?;
        let product = self.resolve_product(&input.product).await?;
        let source = self.catalog().get_department_by_name(&input.from_department).await?;
        let destination = self.catalog().ensure_sink_department(sink).await?;

        self.move_between(user_id, &product, &source, &destination, input.quantity, input.reference)
            .await
    }

    async fn move_between(
        &self,
        user_id: Uuid,
        product: &Product,
        source: &Department,
        destination: &Department,
        quantity: Decimal,
        reference: Option<String>,
    ) -> AppResult<TransferSummary> {
        if source.id == destination.id {
            return Err(AppError::validation(
                "toDepartment",
                "Source and destination departments must differ",
            ));
        }

        let category = DestinationCategory::for_destination(&destination.name);
        let reference = reference_or(reference, || {
            format!("Transfer from {} to {}", source.name, destination.name)
        });

        let mut tx = self.db.begin().await?;
        let (source_stock_id, source_after) = withdraw(&mut tx, product, source.id, quantity).await?;
        let (destination_stock_id, destination_after, created) =
            deposit(&mut tx, product.id, destination.id, quantity).await?;
        tx.commit().await?;

        let outcome = TransferOutcome::from_after(quantity, source_after, destination_after, created);

        tracing::info!(
            product = %product.name,
            from = %source.name,
            to = %destination.name,
            category = category.as_str(),
            quantity = %quantity,
            "Stock transferred"
        );

        let activity = self.activity();
        for (department_id, movement_type, stock_id) in [
            (source.id, MovementType::TransferOut, source_stock_id),
            (destination.id, MovementType::TransferIn, destination_stock_id),
        ] {
            activity
                .log_stock_movement(&NewMovement {
                    product_id: product.id,
                    department_id,
                    quantity,
                    movement_type,
                    destination_category: Some(category),
                    reference: reference.clone(),
                    related_document: Some(stock_id),
                    related_document_type: Some(RelatedDocumentType::Transfer),
                    user_id,
                })
                .await;
        }

        activity
            .log_activity(
                user_id,
                ActivityAction::TransferOut,
                EntityType::Stock,
                source_stock_id,
                json!({
                    "productId": product.id,
                    "toDepartment": destination.name,
                    "quantity": quantity,
                    "oldQuantity": outcome.source_before,
                    "newQuantity": outcome.source_after,
                    "reference": reference,
                }),
            )
            .await;
        activity
            .log_activity(
                user_id,
                ActivityAction::TransferIn,
                EntityType::Stock,
                destination_stock_id,
                json!({
                    "productId": product.id,
                    "fromDepartment": source.name,
                    "quantity": quantity,
                    "oldQuantity": outcome.destination_before,
                    "newQuantity": outcome.destination_after,
                    "reference": reference,
                }),
            )
            .await;

        Ok(TransferSummary {
            product_id: product.id,
            product_name: product.name.clone(),
            from_department: source.name.clone(),
            to_department: destination.name.clone(),
            destination_category: category,
            reference,
            outcome,
        })
    }

    /// Record stock leaving a department (`exit` movement)
    pub async fn remove_stock(&self, user_id: Uuid, input: RemoveStockInput) -> AppResult<Stock> {
        check_quantity(input.quantity)?;
        let product = self.resolve_product(&input.product).await?;
        let department = self.catalog().get_department_by_name(&input.department).await?;

        let mut tx = self.db.begin().await?;
        let (stock_id, new_quantity) = withdraw(&mut tx, &product, department.id, input.quantity).await?;
        tx.commit().await?;

        let reference = reference_or(input.reference, || {
            format!("Stock exit from {}", department.name)
        });

        tracing::info!(
            product = %product.name,
            department = %department.name,
            quantity = %input.quantity,
            new_quantity = %new_quantity,
            "Stock removed"
        );

        let activity = self.activity();
        activity
            .log_stock_movement(&NewMovement {
                product_id: product.id,
                department_id: department.id,
                quantity: input.quantity,
                movement_type: MovementType::Exit,
                destination_category: None,
                reference: reference.clone(),
                related_document: Some(stock_id),
                related_document_type: Some(RelatedDocumentType::Stock),
                user_id,
            })
            .await;
        activity
            .log_activity(
                user_id,
                ActivityAction::Remove,
                EntityType::Stock,
                stock_id,
                json!({
                    "productId": product.id,
                    "department": department.name,
                    "oldQuantity": new_quantity + input.quantity,
                    "newQuantity": new_quantity,
                    "reference": reference,
                }),
            )
            .await;

        self.get_stock(stock_id).await
    }

    /// Set a stock row to an explicit quantity
    pub async fn adjust_stock(&self, user_id: Uuid, input: AdjustStockInput) -> AppResult<AdjustmentSummary> {
        let product = self.resolve_product(&input.product).await?;
        let department = self.catalog().get_department_by_name(&input.department).await?;

        let mut tx = self.db.begin().await?;
        let previous = sqlx::query_scalar::<_, Decimal>(
            "SELECT quantity FROM stocks WHERE product_id = $1 AND department_id = $2 FOR UPDATE",
        )
        .bind(product.id)
        .bind(department.id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(Decimal::ZERO);

        let plan = plan_adjustment(previous, input.quantity)
            .map_err(|m| AppError::validation("quantity", m))?;

        let stock_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stocks (product_id, department_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, department_id) DO UPDATE
            SET quantity = EXCLUDED.quantity, updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(product.id)
        .bind(department.id)
        .bind(plan.target)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        let reason = reference_or(input.reason, || "Manual adjustment".to_string());

        if let Some(movement_type) = plan.movement_type {
            tracing::info!(
                product = %product.name,
                department = %department.name,
                previous = %plan.previous,
                target = %plan.target,
                "Stock adjusted"
            );

            let activity = self.activity();
            activity
                .log_stock_movement(&NewMovement {
                    product_id: product.id,
                    department_id: department.id,
                    quantity: plan.magnitude,
                    movement_type,
                    destination_category: None,
                    reference: reason.clone(),
                    related_document: Some(stock_id),
                    related_document_type: Some(RelatedDocumentType::Adjustment),
                    user_id,
                })
                .await;
            activity
                .log_activity(
                    user_id,
                    ActivityAction::Adjust,
                    EntityType::Stock,
                    stock_id,
                    json!({
                        "productId": product.id,
                        "department": department.name,
                        "oldQuantity": plan.previous,
                        "newQuantity": plan.target,
                        "reason": reason,
                    }),
                )
                .await;
        }

        Ok(AdjustmentSummary {
            stock: self.get_stock(stock_id).await?,
            previous_quantity: plan.previous,
            movement_type: plan.movement_type,
            difference: plan.target - plan.previous,
            reason,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn list_stocks(&self) -> AppResult<Vec<StockView>> {
        let rows = sqlx::query_as::<_, StockView>(&format!(
            "{} ORDER BY d.name, p.name",
            STOCK_VIEW_QUERY
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn stocks_by_department(&self, department_name: &str) -> AppResult<Vec<StockView>> {
        let department = self.catalog().get_department_by_name(department_name).await?;

        let rows = sqlx::query_as::<_, StockView>(&format!(
            "{} WHERE s.department_id = $1 ORDER BY p.name",
            STOCK_VIEW_QUERY
        ))
        .bind(department.id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Rows at or below their product's minimum stock, sinks excluded
    pub async fn low_stock(&self) -> AppResult<Vec<StockView>> {
        let rows = sqlx::query_as::<_, StockView>(&format!(
            "{} WHERE s.quantity <= p.min_stock AND LOWER(d.name) NOT IN (LOWER($1), LOWER($2)) ORDER BY d.name, p.name",
            STOCK_VIEW_QUERY
        ))
        .bind(TRASH_DEPARTMENT)
        .bind(USED_DEPARTMENT)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Σ quantity × price over active departments, with a per-department breakdown
    pub async fn total_value(&self) -> AppResult<StockValuation> {
        let rows = sqlx::query_as::<_, (Uuid, String, Decimal)>(
            r#"
            SELECT d.id, d.name, COALESCE(SUM(s.quantity * p.price), 0)
            FROM stocks s
            JOIN products p ON p.id = s.product_id
            JOIN departments d ON d.id = s.department_id
            WHERE LOWER(d.name) NOT IN (LOWER($1), LOWER($2))
            GROUP BY d.id, d.name
            ORDER BY d.name
            "#,
        )
        .bind(TRASH_DEPARTMENT)
        .bind(USED_DEPARTMENT)
        .fetch_all(&self.db)
        .await?;

        let departments: Vec<DepartmentValue> = rows
            .into_iter()
            .map(|(department_id, department_name, value)| DepartmentValue {
                department_id,
                department_name,
                value,
            })
            .collect();

        Ok(StockValuation {
            total_value: departments.iter().map(|d| d.value).sum(),
            departments,
        })
    }

    /// Current quantity per `(product, department)`
    pub async fn current_levels(
        &self,
        department_id: Option<Uuid>,
    ) -> AppResult<HashMap<(Uuid, Uuid), Decimal>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
            "SELECT product_id, department_id, quantity FROM stocks WHERE ($1::uuid IS NULL OR department_id = $1)",
        )
        .bind(department_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, department_id, quantity)| ((product_id, department_id), quantity))
            .collect())
    }
}
