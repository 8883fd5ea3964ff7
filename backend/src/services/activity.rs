//! Audit trail and movement log
//!
//! Writes are best-effort: a failed audit or movement insert is reported on
//! the tracing channel and never surfaces to the caller, so it cannot undo a
//! stock mutation that has already been committed.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ActivityAction, ActivityLog, DestinationCategory, EntityType, MovementType,
    RelatedDocumentType, StockMovement,
};
use shared::{start_of_day, start_of_next_day, DateRange};

/// Activity service for the audit trail and movement log
#[derive(Clone)]
pub struct ActivityService {
    db: PgPool,
}

/// A movement about to be appended to the log
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub department_id: Uuid,
    pub quantity: Decimal,
    pub movement_type: MovementType,
    pub destination_category: Option<DestinationCategory>,
    pub reference: String,
    pub related_document: Option<Uuid>,
    pub related_document_type: Option<RelatedDocumentType>,
    pub user_id: Uuid,
}

/// Filters for the movement log
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementFilter {
    pub product: Option<Uuid>,
    pub department: Option<Uuid>,
    pub movement_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Filters for the audit trail
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub action: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    department_id: Uuid,
    quantity: Decimal,
    movement_type: String,
    destination_category: Option<String>,
    reference: String,
    related_document: Option<Uuid>,
    related_document_type: Option<String>,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type = MovementType::from_str(&row.movement_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown movement type '{}'", row.movement_type))
        })?;
        Ok(StockMovement {
            id: row.id,
            product_id: row.product_id,
            department_id: row.department_id,
            quantity: row.quantity,
            movement_type,
            destination_category: row
                .destination_category
                .as_deref()
                .and_then(DestinationCategory::from_str),
            reference: row.reference,
            related_document: row.related_document,
            related_document_type: row
                .related_document_type
                .as_deref()
                .and_then(RelatedDocumentType::from_str),
            user_id: row.user_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: Uuid,
    action: String,
    entity_type: String,
    entity_id: Uuid,
    changes: serde_json::Value,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for ActivityLog {
    type Error = AppError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let entity_type = EntityType::from_str(&row.entity_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown entity type '{}'", row.entity_type))
        })?;
        Ok(ActivityLog {
            id: row.id,
            action: row.action,
            entity_type,
            entity_id: row.entity_id,
            changes: row.changes,
            user_id: row.user_id,
            created_at: row.created_at,
        })
    }
}

const MOVEMENT_COLUMNS: &str = "id, product_id, department_id, quantity, movement_type, \
     destination_category, reference, related_document, related_document_type, user_id, created_at";

fn to_movements(rows: Vec<MovementRow>) -> AppResult<Vec<StockMovement>> {
    rows.into_iter().map(StockMovement::try_from).collect()
}

impl ActivityService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append an audit entry
    pub async fn log_activity(
        &self,
        user_id: Uuid,
        action: ActivityAction,
        entity_type: EntityType,
        entity_id: Uuid,
        changes: serde_json::Value,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO activity_logs (action, entity_type, entity_id, changes, user_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(action.as_str())
        .bind(entity_type.as_str())
        .bind(entity_id)
        .bind(&changes)
        .bind(user_id)
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                error = %e,
                action = action.as_str(),
                entity_type = entity_type.as_str(),
                %entity_id,
                "Failed to write activity log"
            );
        }
    }

    /// Append a movement to the log
    pub async fn log_stock_movement(&self, movement: &NewMovement) {
        let result = sqlx::query(
            r#"
            INSERT INTO stock_movements (
                product_id, department_id, quantity, movement_type, destination_category,
                reference, related_document, related_document_type, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(movement.product_id)
        .bind(movement.department_id)
        .bind(movement.quantity)
        .bind(movement.movement_type.as_str())
        .bind(movement.destination_category.map(|c| c.as_str()))
        .bind(&movement.reference)
        .bind(movement.related_document)
        .bind(movement.related_document_type.map(|t| t.as_str()))
        .bind(movement.user_id)
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                error = %e,
                product_id = %movement.product_id,
                department_id = %movement.department_id,
                movement_type = movement.movement_type.as_str(),
                quantity = %movement.quantity,
                "Failed to write stock movement"
            );
        }
    }

    /// Movement log, newest first
    pub async fn list_stock_movements(&self, filter: &MovementFilter) -> AppResult<Vec<StockMovement>> {
        if let Some(ref t) = filter.movement_type {
            if MovementType::from_str(t).is_none() {
                return Err(AppError::validation(
                    "movementType",
                    format!("Unknown movement type '{}'", t),
                ));
            }
        }

        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {}
            FROM stock_movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR department_id = $2)
              AND ($3::text IS NULL OR movement_type = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(filter.product)
        .bind(filter.department)
        .bind(&filter.movement_type)
        .bind(filter.start_date.map(start_of_day))
        .bind(filter.end_date.map(start_of_next_day))
        .fetch_all(&self.db)
        .await?;

        to_movements(rows)
    }

    pub async fn product_movements(&self, product_id: Uuid) -> AppResult<Vec<StockMovement>> {
        self.list_stock_movements(&MovementFilter {
            product: Some(product_id),
            ..Default::default()
        })
        .await
    }

    /// Movements for the given products within a date range, oldest first
    pub async fn movements_in_range(
        &self,
        product_ids: &[Uuid],
        range: &DateRange,
        department_id: Option<Uuid>,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {}
            FROM stock_movements
            WHERE product_id = ANY($1)
              AND created_at >= $2
              AND created_at < $3
              AND ($4::uuid IS NULL OR department_id = $4)
            ORDER BY created_at ASC
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(product_ids)
        .bind(range.start_instant())
        .bind(range.end_exclusive())
        .bind(department_id)
        .fetch_all(&self.db)
        .await?;

        to_movements(rows)
    }

    /// Every movement recorded at or after `since`, oldest first
    pub async fn movements_since(
        &self,
        since: DateTime<Utc>,
        department_id: Option<Uuid>,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {}
            FROM stock_movements
            WHERE created_at >= $1
              AND ($2::uuid IS NULL OR department_id = $2)
            ORDER BY created_at ASC
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(since)
        .bind(department_id)
        .fetch_all(&self.db)
        .await?;

        to_movements(rows)
    }

    /// Audit trail, newest first
    pub async fn list_activity(&self, filter: &ActivityFilter) -> AppResult<Vec<ActivityLog>> {
        if let Some(ref t) = filter.entity_type {
            if EntityType::from_str(t).is_none() {
                return Err(AppError::validation(
                    "entityType",
                    format!("Unknown entity type '{}'", t),
                ));
            }
        }

        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, action, entity_type, entity_id, changes, user_id, created_at
            FROM activity_logs
            WHERE ($1::text IS NULL OR entity_type = $1)
              AND ($2::uuid IS NULL OR entity_id = $2)
              AND ($3::text IS NULL OR action = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC
            "#,
        )
        .bind(&filter.entity_type)
        .bind(filter.entity_id)
        .bind(&filter.action)
        .bind(filter.start_date.map(start_of_day))
        .bind(filter.end_date.map(start_of_next_day))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ActivityLog::try_from).collect()
    }

    pub async fn entity_activity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> AppResult<Vec<ActivityLog>> {
        self.list_activity(&ActivityFilter {
            entity_type: Some(entity_type.to_string()),
            entity_id: Some(entity_id),
            ..Default::default()
        })
        .await
    }
}
