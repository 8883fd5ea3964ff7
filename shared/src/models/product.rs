//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked product (ingredient or consumable)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Optional unique barcode
    pub barcode: Option<String>,
    /// Unit of measure (kg, L, piece, ...)
    pub unit: String,
    /// Stock level at or below which the product is reported as low
    pub min_stock: Decimal,
    /// Current unit price
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
