//! Change types, entity types, and the sync stage state machine.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for SQL storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// ChangeType
// ---------------------------------------------------------------------------

/// Kind of difference recorded in the changelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

impl ChangeType {
    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(CoreError::Validation(format!("unknown change type: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Level of the catalog hierarchy an entity lives at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Dataset,
    Table,
    Column,
}

impl EntityType {
    /// Return the string representation used in SQL storage and search documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Table => "table",
            Self::Column => "column",
        }
    }

    /// Id prefix for entities of this type.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Dataset => crate::ids::PREFIX_DATASET,
            Self::Table => crate::ids::PREFIX_TABLE,
            Self::Column => crate::ids::PREFIX_COLUMN,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dataset" => Ok(Self::Dataset),
            "table" => Ok(Self::Table),
            "column" => Ok(Self::Column),
            other => Err(CoreError::Validation(format!("unknown entity type: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncStage
// ---------------------------------------------------------------------------

/// Stage of a single catalog sync.
///
/// ```text
/// start → snapshot_before → begin_tx → mark_pending → fetch_and_upsert
///       → sweep_delete → commit → snapshot_after → create_sync_run
///       → diff_and_record_changelog → sync_index → done
///
/// any stage from mark_pending through sweep_delete → rollback → failed
/// start, snapshot_before, begin_tx, commit           → failed
/// snapshot_after                                     → done
/// diff_and_record_changelog                          → sync_index
/// ```
///
/// The sync run and its changelog are stored in one transaction, so a
/// failure there skips both.
///
/// Once `commit` succeeds the sync can no longer fail; post-commit stages
/// only skip ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Start,
    SnapshotBefore,
    BeginTx,
    MarkPending,
    FetchAndUpsert,
    SweepDelete,
    Commit,
    SnapshotAfter,
    CreateSyncRun,
    DiffAndRecordChangelog,
    SyncIndex,
    Done,
    Rollback,
    Failed,
}

impl SyncStage {
    /// Valid next stages from the current stage.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Start => &[Self::SnapshotBefore, Self::Failed],
            Self::SnapshotBefore => &[Self::BeginTx, Self::Failed],
            Self::BeginTx => &[Self::MarkPending, Self::Failed],
            Self::MarkPending => &[Self::FetchAndUpsert, Self::Rollback],
            Self::FetchAndUpsert => &[Self::SweepDelete, Self::Rollback],
            Self::SweepDelete => &[Self::Commit, Self::Rollback],
            Self::Commit => &[Self::SnapshotAfter, Self::Failed],
            Self::SnapshotAfter => &[Self::CreateSyncRun, Self::Done],
            Self::CreateSyncRun => &[Self::DiffAndRecordChangelog],
            Self::DiffAndRecordChangelog => &[Self::SyncIndex],
            Self::SyncIndex => &[Self::Done],
            Self::Rollback => &[Self::Failed],
            Self::Done | Self::Failed => &[],
        }
    }

    /// Check whether transitioning to `next` is valid.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Whether the sync has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether the catalog write has been committed at this stage.
    #[must_use]
    pub const fn is_post_commit(self) -> bool {
        matches!(
            self,
            Self::SnapshotAfter
                | Self::CreateSyncRun
                | Self::DiffAndRecordChangelog
                | Self::SyncIndex
                | Self::Done
        )
    }

    /// Return the string representation used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::SnapshotBefore => "snapshot_before",
            Self::BeginTx => "begin_tx",
            Self::MarkPending => "mark_pending",
            Self::FetchAndUpsert => "fetch_and_upsert",
            Self::SweepDelete => "sweep_delete",
            Self::Commit => "commit",
            Self::SnapshotAfter => "snapshot_after",
            Self::CreateSyncRun => "create_sync_run",
            Self::DiffAndRecordChangelog => "diff_and_record_changelog",
            Self::SyncIndex => "sync_index",
            Self::Done => "done",
            Self::Rollback => "rollback",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
