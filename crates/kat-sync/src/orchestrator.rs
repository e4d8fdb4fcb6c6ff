//! Sync orchestration.
//!
//! A [`Syncer`] drives one project through the [`SyncStage`] machine:
//! snapshot, transactional mark-and-sweep write, commit, then the
//! best-effort tail (second snapshot, sync run, changelog, search index).
//! Anything failing before commit rolls back and fails the sync. Nothing
//! after commit can fail it.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use kat_config::KatalogConfig;
use kat_core::enums::SyncStage;
use kat_core::snapshot::CatalogSnapshot;
use kat_db::KatDb;
use kat_db::writer::{CatalogWriter, SweepReport, UpsertCounts};
use kat_search::SearchIndex;
use kat_search::synchronizer::{IndexReport, IndexSynchronizer};
use kat_warehouse::CatalogProvider;
use kat_warehouse::retry::RetryConfig;
use serde::Serialize;

use crate::error::SyncError;
use crate::locks::{ProjectGuard, ProjectLocks};
use crate::pipeline::{FetchSettings, fetch_and_upsert};
use crate::recorder::{ChangelogRecorder, RecordedChanges};

/// Tunables for a [`Syncer`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub fetch: FetchSettings,
    pub index_batch_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            index_batch_size: 1000,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn from_config(config: &KatalogConfig) -> Self {
        Self {
            fetch: FetchSettings {
                max_concurrent_fetches: config.sync.max_concurrent_fetches,
                channel_capacity: config.sync.channel_capacity,
                retry: RetryConfig::from(&config.warehouse),
            },
            index_batch_size: config.search.batch_size,
        }
    }
}

/// How the search index fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexStatus {
    Synced(IndexReport),
    /// No index configured, or no post-commit snapshot to push.
    Skipped,
    Failed { error: String },
}

/// Result of a successful sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub project_id: String,
    /// `None` when the sync run could not be recorded after commit.
    pub sync_run_id: Option<String>,
    pub remote_datasets: usize,
    pub upserted: UpsertCounts,
    pub removed: SweepReport,
    /// `None` when no changelog was recorded.
    pub changes: Option<RecordedChanges>,
    pub index: IndexStatus,
    pub elapsed_ms: u64,
}

impl SyncOutcome {
    #[must_use]
    pub fn changelog_entries(&self) -> usize {
        self.changes.map_or(0, |c| c.total())
    }
}

/// Logs and validates stage transitions for one sync.
struct Stages<'a> {
    project_id: &'a str,
    current: SyncStage,
}

impl<'a> Stages<'a> {
    const fn new(project_id: &'a str) -> Self {
        Self {
            project_id,
            current: SyncStage::Start,
        }
    }

    fn advance(&mut self, next: SyncStage) {
        debug_assert!(
            self.current.can_transition_to(next),
            "invalid sync transition {} -> {}",
            self.current.as_str(),
            next.as_str()
        );
        tracing::debug!(
            project_id = self.project_id,
            from = self.current.as_str(),
            to = next.as_str(),
            "sync stage"
        );
        self.current = next;
    }

    fn fail(&mut self, err: SyncError) -> SyncError {
        self.advance(SyncStage::Failed);
        tracing::warn!(project_id = self.project_id, error = %err, "sync failed");
        err
    }
}

/// Synchronizes projects from one catalog provider into the store.
pub struct Syncer<P, S> {
    db: Arc<KatDb>,
    provider: Arc<P>,
    index: Option<Arc<S>>,
    locks: Arc<ProjectLocks>,
    settings: SyncSettings,
}

impl<P, S> Syncer<P, S>
where
    P: CatalogProvider + 'static,
    S: SearchIndex,
{
    #[must_use]
    pub fn new(db: Arc<KatDb>, provider: Arc<P>, settings: SyncSettings) -> Self {
        Self {
            db,
            provider,
            index: None,
            locks: Arc::new(ProjectLocks::new()),
            settings,
        }
    }

    /// Push each committed snapshot to `index`.
    #[must_use]
    pub fn with_index(mut self, index: Arc<S>) -> Self {
        self.index = Some(index);
        self
    }

    /// Share a lock registry with other syncers.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<ProjectLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Sync `project_id`, waiting for any sync already running on it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the sync failed before commit. The catalog
    /// is unchanged in that case.
    pub async fn run(&self, project_id: &str) -> Result<SyncOutcome, SyncError> {
        let guard = self.locks.lock(project_id).await;
        self.run_locked(&guard).await
    }

    /// Sync `project_id`, or fail at once if it is already being synced.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`], or any error [`Syncer::run`]
    /// returns.
    pub async fn try_run(&self, project_id: &str) -> Result<SyncOutcome, SyncError> {
        let guard = self.locks.try_lock(project_id)?;
        self.run_locked(&guard).await
    }

    async fn run_locked(&self, guard: &ProjectGuard) -> Result<SyncOutcome, SyncError> {
        let project_id = guard.project_id();
        let clock = Instant::now();
        let started_at = Utc::now();
        let mut stages = Stages::new(project_id);

        stages.advance(SyncStage::SnapshotBefore);
        let before = match self.db.load_snapshot(project_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(stages.fail(e.into())),
        };

        stages.advance(SyncStage::BeginTx);
        let mut writer = match self.db.begin_catalog_write(project_id).await {
            Ok(writer) => writer,
            Err(e) => return Err(stages.fail(e.into())),
        };

        let (remote_datasets, removed) = match self.apply_remote(&mut stages, &mut writer).await {
            Ok(applied) => applied,
            Err(e) => {
                stages.advance(SyncStage::Rollback);
                if let Err(rb) = writer.rollback().await {
                    tracing::error!(project_id, error = %rb, "rollback failed");
                }
                return Err(stages.fail(e));
            }
        };

        stages.advance(SyncStage::Commit);
        let upserted = match writer.commit().await {
            Ok(counts) => counts,
            Err(e) => return Err(stages.fail(e.into())),
        };

        let mut outcome = SyncOutcome {
            project_id: project_id.to_string(),
            sync_run_id: None,
            remote_datasets,
            upserted,
            removed,
            changes: None,
            index: IndexStatus::Skipped,
            elapsed_ms: 0,
        };

        stages.advance(SyncStage::SnapshotAfter);
        match self.db.load_snapshot(project_id).await {
            Ok(after) => self.finish(&mut stages, &mut outcome, &before, &after, started_at).await,
            Err(e) => {
                tracing::error!(
                    project_id,
                    error = %e,
                    "post-commit snapshot failed, skipping changelog and index"
                );
                stages.advance(SyncStage::Done);
            }
        }

        outcome.elapsed_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            project_id,
            sync_run_id = outcome.sync_run_id.as_deref().unwrap_or("-"),
            datasets = outcome.upserted.datasets,
            tables = outcome.upserted.tables,
            columns = outcome.upserted.columns,
            removed = outcome.removed.len(),
            changes = outcome.changelog_entries(),
            elapsed_ms = outcome.elapsed_ms,
            "sync complete"
        );
        Ok(outcome)
    }

    /// Stages between `BeginTx` and `Commit`.
    async fn apply_remote(
        &self,
        stages: &mut Stages<'_>,
        writer: &mut CatalogWriter,
    ) -> Result<(usize, SweepReport), SyncError> {
        stages.advance(SyncStage::MarkPending);
        writer.mark_pending().await?;

        stages.advance(SyncStage::FetchAndUpsert);
        let remote_datasets =
            fetch_and_upsert(Arc::clone(&self.provider), writer, &self.settings.fetch).await?;

        stages.advance(SyncStage::SweepDelete);
        let removed = writer.sweep().await?;
        Ok((remote_datasets, removed))
    }

    /// Post-commit tail. Failures here are logged, never returned.
    async fn finish(
        &self,
        stages: &mut Stages<'_>,
        outcome: &mut SyncOutcome,
        before: &CatalogSnapshot,
        after: &CatalogSnapshot,
        started_at: chrono::DateTime<Utc>,
    ) {
        let project_id = stages.project_id;

        // The sync run and its changelog are written in one transaction.
        stages.advance(SyncStage::CreateSyncRun);
        stages.advance(SyncStage::DiffAndRecordChangelog);
        match ChangelogRecorder::new(&self.db)
            .record(project_id, started_at, before, after)
            .await
        {
            Ok((run, changes)) => {
                outcome.sync_run_id = Some(run.id);
                outcome.changes = Some(changes);
            }
            Err(e) => {
                tracing::warn!(
                    project_id,
                    error = %e,
                    "sync run and changelog not recorded"
                );
            }
        }

        stages.advance(SyncStage::SyncIndex);
        outcome.index = self.sync_index(project_id, after, &outcome.removed).await;
        stages.advance(SyncStage::Done);
    }

    async fn sync_index(
        &self,
        project_id: &str,
        after: &CatalogSnapshot,
        removed: &SweepReport,
    ) -> IndexStatus {
        let Some(index) = &self.index else {
            return IndexStatus::Skipped;
        };
        let removed: Vec<String> = removed.all_ids().map(str::to_string).collect();
        match IndexSynchronizer::new(index.as_ref(), self.settings.index_batch_size)
            .sync(after, &removed)
            .await
        {
            Ok(report) => IndexStatus::Synced(report),
            Err(e) => {
                tracing::warn!(project_id, error = %e, "search index not updated");
                IndexStatus::Failed { error: e.to_string() }
            }
        }
    }
}
