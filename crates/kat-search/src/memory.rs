//! In-memory [`SearchIndex`] for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::documents::ResourceDocument;
use crate::query::SearchRequest;
use crate::{SearchError, SearchIndex, TaskInfo};

/// Documents keyed by id, with optional failure injection.
///
/// Tasks complete synchronously and report `succeeded`.
#[derive(Default)]
pub struct InMemoryIndex {
    docs: Mutex<BTreeMap<String, ResourceDocument>>,
    batches: Mutex<Vec<usize>>,
    next_task: AtomicU64,
    failing: AtomicBool,
    rejecting_upserts: AtomicBool,
}

impl InMemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An index whose every operation fails until [`set_failing`](Self::set_failing)
    /// turns it back on.
    #[must_use]
    pub fn unavailable() -> Self {
        let index = Self::default();
        index.set_failing(true);
        index
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only `add_documents`; deletes and searches keep working.
    pub fn set_rejecting_upserts(&self, rejecting: bool) {
        self.rejecting_upserts.store(rejecting, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<ResourceDocument> {
        self.lock_docs().get(id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_docs().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted ids of every stored document.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.lock_docs().keys().cloned().collect()
    }

    /// Sizes of every add and delete batch received, in order.
    #[must_use]
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn lock_docs(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ResourceDocument>> {
        self.docs.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), SearchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchError::Injected("index unavailable".into()));
        }
        Ok(())
    }

    fn finish(&self, kind: &str, batch: usize) -> TaskInfo {
        self.batches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(batch);
        TaskInfo {
            task_uid: self.next_task.fetch_add(1, Ordering::SeqCst),
            index_uid: Some("memory".into()),
            status: "succeeded".into(),
            kind: kind.into(),
        }
    }
}

fn matches_text(doc: &ResourceDocument, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let needle = needle.to_lowercase();
    [Some(doc.name()), Some(doc.description()), doc.column_type()]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

impl SearchIndex for InMemoryIndex {
    async fn add_documents(
        &self,
        documents: &[ResourceDocument],
        _primary_key: &str,
    ) -> Result<TaskInfo, SearchError> {
        self.check_available()?;
        if self.rejecting_upserts.load(Ordering::SeqCst) {
            return Err(SearchError::Injected("upsert rejected".into()));
        }
        {
            let mut docs = self.lock_docs();
            for doc in documents {
                docs.insert(doc.id().to_string(), doc.clone());
            }
        }
        Ok(self.finish("documentAdditionOrUpdate", documents.len()))
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<TaskInfo, SearchError> {
        self.check_available()?;
        {
            let mut docs = self.lock_docs();
            for id in ids {
                docs.remove(id);
            }
        }
        Ok(self.finish("documentDeletion", ids.len()))
    }

    async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ResourceDocument>, SearchError> {
        self.check_available()?;
        let query = &request.query;
        Ok(self
            .lock_docs()
            .values()
            .filter(|doc| doc.project_id() == query.project_id)
            .filter(|doc| query.includes(doc.entity_type()))
            .filter(|doc| matches_text(doc, &query.text))
            .take(request.limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{documents_from_snapshot, fixtures, PRIMARY_KEY};
    use crate::query::ResourceQuery;
    use pretty_assertions::assert_eq;

    async fn seeded() -> InMemoryIndex {
        let index = InMemoryIndex::new();
        let docs = documents_from_snapshot(&fixtures::snapshot());
        index.add_documents(&docs, PRIMARY_KEY).await.unwrap();
        index
    }

    fn ids(hits: &[ResourceDocument]) -> Vec<&str> {
        hits.iter().map(ResourceDocument::id).collect()
    }

    #[tokio::test]
    async fn search_respects_type_prefix() {
        let index = seeded().await;
        let req = SearchRequest::new(ResourceQuery::parse("prj-a", "col:"), 10);
        assert_eq!(ids(&index.search(&req).await.unwrap()), vec!["col-1", "col-2"]);
    }

    #[tokio::test]
    async fn search_matches_description_and_column_type() {
        let index = seeded().await;
        let req = SearchRequest::new(ResourceQuery::parse("prj-a", "customer"), 10);
        assert_eq!(ids(&index.search(&req).await.unwrap()), vec!["tbl-1"]);

        let req = SearchRequest::new(ResourceQuery::parse("prj-a", "numeric"), 10);
        assert_eq!(ids(&index.search(&req).await.unwrap()), vec!["col-2"]);
    }

    #[tokio::test]
    async fn search_is_scoped_to_project() {
        let index = seeded().await;
        let req = SearchRequest::new(ResourceQuery::parse("prj-b", ""), 10);
        assert!(index.search(&req).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_documents() {
        let index = seeded().await;
        index.delete_documents(&["col-1".into(), "missing".into()]).await.unwrap();
        assert_eq!(index.ids(), vec!["col-2", "dst-1", "tbl-1"]);
        assert_eq!(index.batch_sizes(), vec![4, 2]);
    }

    #[tokio::test]
    async fn unavailable_index_rejects_everything() {
        let index = InMemoryIndex::unavailable();
        let err = index.delete_documents(&[]).await.unwrap_err();
        assert!(matches!(err, SearchError::Injected(_)));
        index.set_failing(false);
        assert!(index.delete_documents(&[]).await.is_ok());
    }
}
