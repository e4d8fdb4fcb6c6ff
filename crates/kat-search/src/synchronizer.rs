//! Push a committed snapshot into the resource index.

use kat_core::snapshot::CatalogSnapshot;
use serde::Serialize;

use crate::documents::{PRIMARY_KEY, documents_from_snapshot};
use crate::{SearchError, SearchIndex};

/// What one synchronization sent to the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub upserted: usize,
    pub deleted: usize,
    pub tasks: usize,
}

/// Batches snapshot documents and removed ids into index requests.
pub struct IndexSynchronizer<'a, S> {
    index: &'a S,
    batch_size: usize,
}

impl<'a, S: SearchIndex> IndexSynchronizer<'a, S> {
    /// A `batch_size` of zero is treated as one.
    #[must_use]
    pub fn new(index: &'a S, batch_size: usize) -> Self {
        Self {
            index,
            batch_size: batch_size.max(1),
        }
    }

    /// Upsert every resource in `snapshot`, then delete `removed_ids`.
    ///
    /// Every batch is attempted even after one fails, so removed
    /// resources stop being searchable when upserts are rejected.
    /// Documents already sent stay indexed.
    ///
    /// # Errors
    ///
    /// Returns the first [`SearchError`] reported by the index.
    pub async fn sync(
        &self,
        snapshot: &CatalogSnapshot,
        removed_ids: &[String],
    ) -> Result<IndexReport, SearchError> {
        let mut report = IndexReport::default();
        let mut first_error = None;
        let documents = documents_from_snapshot(snapshot);

        for batch in documents.chunks(self.batch_size) {
            match self.index.add_documents(batch, PRIMARY_KEY).await {
                Ok(task) => {
                    tracing::debug!(
                        task = task.task_uid,
                        documents = batch.len(),
                        "index upsert enqueued"
                    );
                    report.upserted += batch.len();
                    report.tasks += 1;
                }
                Err(e) => {
                    tracing::warn!(documents = batch.len(), error = %e, "index upsert failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        for batch in removed_ids.chunks(self.batch_size) {
            match self.index.delete_documents(batch).await {
                Ok(task) => {
                    tracing::debug!(
                        task = task.task_uid,
                        documents = batch.len(),
                        "index delete enqueued"
                    );
                    report.deleted += batch.len();
                    report.tasks += 1;
                }
                Err(e) => {
                    tracing::warn!(documents = batch.len(), error = %e, "index delete failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        tracing::debug!(
            project_id = %snapshot.project_id,
            upserted = report.upserted,
            deleted = report.deleted,
            "index synchronized"
        );
        Ok(report)
    }
}
