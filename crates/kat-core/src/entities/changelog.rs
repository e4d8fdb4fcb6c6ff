use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{ChangeType, EntityType};

/// Append-only audit row for one detected catalog difference.
///
/// `field_name`, `old_value` and `new_value` are empty unless
/// `change_type` is [`ChangeType::Update`]. Values are JSON-encoded scalars
/// (`"\"text\""`, `"42"`). Parent context is set for tables (the dataset)
/// and columns (the table, with the dataset as grandparent).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub id: String,
    pub sync_id: String,
    pub change_type: ChangeType,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub entity_name: String,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
    pub parent_id: Option<String>,
    pub parent_name: Option<String>,
    pub grandparent_id: Option<String>,
    pub grandparent_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
