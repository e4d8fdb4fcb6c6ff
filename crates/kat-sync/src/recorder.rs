//! Changelog recording.
//!
//! The audit trail is computed from two snapshots read independently of the
//! write path, so it reflects what actually landed in the store rather than
//! what the writer intended.

use chrono::{DateTime, Utc};
use kat_core::entities::SyncRun;
use kat_core::enums::ChangeType;
use kat_core::snapshot::CatalogSnapshot;
use kat_db::KatDb;
use kat_db::error::DatabaseError;
use serde::Serialize;

use crate::reconciler::diff;

/// Entries persisted for one sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordedChanges {
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl RecordedChanges {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

pub struct ChangelogRecorder<'a> {
    db: &'a KatDb,
}

impl<'a> ChangelogRecorder<'a> {
    #[must_use]
    pub const fn new(db: &'a KatDb) -> Self {
        Self { db }
    }

    /// Diff `before` against `after` and store the sync run for
    /// `project_id` together with every change.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the diff or the write fails. Neither the
    /// sync run nor any entry is kept in that case.
    pub async fn record(
        &self,
        project_id: &str,
        started_at: DateTime<Utc>,
        before: &CatalogSnapshot,
        after: &CatalogSnapshot,
    ) -> Result<(SyncRun, RecordedChanges), DatabaseError> {
        let records = diff(before, after)?;
        let mut recorded = RecordedChanges::default();
        for record in &records {
            match record.change_type {
                ChangeType::Insert => recorded.inserts += 1,
                ChangeType::Update => recorded.updates += 1,
                ChangeType::Delete => recorded.deletes += 1,
            }
        }
        let run = self.db.record_sync(project_id, started_at, &records).await?;
        tracing::debug!(
            sync_run_id = %run.id,
            inserts = recorded.inserts,
            updates = recorded.updates,
            deletes = recorded.deletes,
            "changelog recorded"
        );
        Ok((run, recorded))
    }
}
