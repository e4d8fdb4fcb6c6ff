use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed reconciliation of a project. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncRun {
    pub id: String,
    pub project_id: String,
    pub started_at: DateTime<Utc>,
}
