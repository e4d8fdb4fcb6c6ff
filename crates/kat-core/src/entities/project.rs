use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root of one catalog. Every dataset belongs to exactly one project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
