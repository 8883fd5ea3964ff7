//! Stock ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::department::{TRASH_DEPARTMENT, USED_DEPARTMENT};

/// Current on-hand quantity of one product in one department
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub id: Uuid,
    pub product_id: Uuid,
    pub department_id: Uuid,
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock movement types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Entry,
    Exit,
    TransferIn,
    TransferOut,
    AdjustmentIn,
    AdjustmentOut,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "entry",
            MovementType::Exit => "exit",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::AdjustmentIn => "adjustment_in",
            MovementType::AdjustmentOut => "adjustment_out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(MovementType::Entry),
            "exit" => Some(MovementType::Exit),
            "transfer_in" => Some(MovementType::TransferIn),
            "transfer_out" => Some(MovementType::TransferOut),
            "adjustment_in" => Some(MovementType::AdjustmentIn),
            "adjustment_out" => Some(MovementType::AdjustmentOut),
            _ => None,
        }
    }

    /// Whether the movement increases the department's stock
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            MovementType::Entry | MovementType::TransferIn | MovementType::AdjustmentIn
        )
    }

    /// Signed effect of a movement of `quantity` on the stock level
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        if self.is_inbound() {
            quantity
        } else {
            -quantity
        }
    }
}

/// Where a transfer sends its stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationCategory {
    Trash,
    Used,
    Other,
}

impl DestinationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationCategory::Trash => "trash",
            DestinationCategory::Used => "used",
            DestinationCategory::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "trash" => Some(DestinationCategory::Trash),
            "used" => Some(DestinationCategory::Used),
            "other" => Some(DestinationCategory::Other),
            _ => None,
        }
    }

    /// Category implied by the destination department's name
    pub fn for_destination(department_name: &str) -> Self {
        if department_name.eq_ignore_ascii_case(TRASH_DEPARTMENT) {
            DestinationCategory::Trash
        } else if department_name.eq_ignore_ascii_case(USED_DEPARTMENT) {
            DestinationCategory::Used
        } else {
            DestinationCategory::Other
        }
    }
}

/// Kind of document a movement originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelatedDocumentType {
    Stock,
    Recipe,
    DailyCalculation,
    Transfer,
    Adjustment,
}

impl RelatedDocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedDocumentType::Stock => "Stock",
            RelatedDocumentType::Recipe => "Recipe",
            RelatedDocumentType::DailyCalculation => "DailyCalculation",
            RelatedDocumentType::Transfer => "Transfer",
            RelatedDocumentType::Adjustment => "Adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Stock" => Some(RelatedDocumentType::Stock),
            "Recipe" => Some(RelatedDocumentType::Recipe),
            "DailyCalculation" => Some(RelatedDocumentType::DailyCalculation),
            "Transfer" => Some(RelatedDocumentType::Transfer),
            "Adjustment" => Some(RelatedDocumentType::Adjustment),
            _ => None,
        }
    }
}

/// Append-only ledger entry. `quantity` is always a positive magnitude.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub department_id: Uuid,
    pub quantity: Decimal,
    pub movement_type: MovementType,
    /// Set on transfer movements only
    pub destination_category: Option<DestinationCategory>,
    pub reference: String,
    pub related_document: Option<Uuid>,
    pub related_document_type: Option<RelatedDocumentType>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_type_round_trips_through_str() {
        for t in [
            MovementType::Entry,
            MovementType::Exit,
            MovementType::TransferIn,
            MovementType::TransferOut,
            MovementType::AdjustmentIn,
            MovementType::AdjustmentOut,
        ] {
            assert_eq!(MovementType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(MovementType::from_str("adjustment"), None);
    }

    #[test]
    fn test_signed_effects() {
        let qty = Decimal::from(4);
        assert_eq!(MovementType::Entry.signed(qty), qty);
        assert_eq!(MovementType::TransferIn.signed(qty), qty);
        assert_eq!(MovementType::AdjustmentIn.signed(qty), qty);
        assert_eq!(MovementType::Exit.signed(qty), -qty);
        assert_eq!(MovementType::TransferOut.signed(qty), -qty);
        assert_eq!(MovementType::AdjustmentOut.signed(qty), -qty);
    }

    #[test]
    fn test_destination_category_from_department_name() {
        assert_eq!(
            DestinationCategory::for_destination("Trash"),
            DestinationCategory::Trash
        );
        assert_eq!(
            DestinationCategory::for_destination("used"),
            DestinationCategory::Used
        );
        assert_eq!(
            DestinationCategory::for_destination("Pastry"),
            DestinationCategory::Other
        );
    }
}
