//! Audit trail models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of entity an activity entry can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    User,
    Product,
    Recipe,
    Department,
    Stock,
    DailyCalculation,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "User",
            EntityType::Product => "Product",
            EntityType::Recipe => "Recipe",
            EntityType::Department => "Department",
            EntityType::Stock => "Stock",
            EntityType::DailyCalculation => "DailyCalculation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "User" => Some(EntityType::User),
            "Product" => Some(EntityType::Product),
            "Recipe" => Some(EntityType::Recipe),
            "Department" => Some(EntityType::Department),
            "Stock" => Some(EntityType::Stock),
            "DailyCalculation" => Some(EntityType::DailyCalculation),
            _ => None,
        }
    }
}

/// Audited actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    TransferOut,
    TransferIn,
    Remove,
    Adjust,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Delete => "delete",
            ActivityAction::TransferOut => "transfer_out",
            ActivityAction::TransferIn => "transfer_in",
            ActivityAction::Remove => "remove",
            ActivityAction::Adjust => "adjust",
        }
    }
}

/// Immutable audit entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Uuid,
    pub action: String,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    /// Old/new values or a creation snapshot
    pub changes: serde_json::Value,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
