//! Department models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sink department for disposed stock
pub const TRASH_DEPARTMENT: &str = "Trash";

/// Sink department for consumed stock
pub const USED_DEPARTMENT: &str = "Used";

/// An organizational unit holding its own stock of each product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    /// Unique, human-readable name
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Department {
    /// Whether this is one of the Trash/Used sink departments
    pub fn is_sink(&self) -> bool {
        is_sink_name(&self.name)
    }
}

pub fn is_sink_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(TRASH_DEPARTMENT) || name.eq_ignore_ascii_case(USED_DEPARTMENT)
}
