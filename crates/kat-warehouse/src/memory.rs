//! Deterministic in-memory catalog provider.
//!
//! Serves a fixed catalog with real pagination and optional injected
//! failures, for tests and offline runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    CatalogProvider, ColumnSchema, DatasetMetadata, DatasetRef, ErrorKind, Page, ProviderError,
    TableMetadata, TableRef,
};

/// A dataset in an [`InMemoryCatalog`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    pub name: String,
    pub description: String,
    pub tables: Vec<MemoryTable>,
}

impl MemoryDataset {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn table(mut self, table: MemoryTable) -> Self {
        self.tables.push(table);
        self
    }
}

/// A table in an [`InMemoryCatalog`].
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub name: String,
    pub metadata: TableMetadata,
}

impl MemoryTable {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: TableMetadata::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    #[must_use]
    pub const fn row_count(mut self, rows: i64) -> Self {
        self.metadata.row_count = rows;
        self
    }

    #[must_use]
    pub fn column(
        mut self,
        name: impl Into<String>,
        column_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.metadata.columns.push(ColumnSchema {
            name: name.into(),
            column_type: column_type.into(),
            description: description.into(),
        });
        self
    }
}

/// Call site for an injected failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailAt {
    ListDatasets,
    DatasetMetadata(String),
    ListTables(String),
    /// `(dataset, table)`
    TableMetadata(String, String),
}

#[derive(Debug)]
struct Injected {
    kind: ErrorKind,
    remaining: u32,
}

/// Provider backed by a catalog held in memory.
#[derive(Debug)]
pub struct InMemoryCatalog {
    project_id: String,
    datasets: Vec<MemoryDataset>,
    page_size: usize,
    failures: Mutex<HashMap<FailAt, Injected>>,
    calls: AtomicUsize,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            datasets: Vec::new(),
            page_size: 1000,
            failures: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn dataset(mut self, dataset: MemoryDataset) -> Self {
        self.datasets.push(dataset);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fail every call at `at` with an error of `kind`.
    #[must_use]
    pub fn fail_at(self, at: FailAt, kind: ErrorKind) -> Self {
        self.fail_times(at, kind, u32::MAX)
    }

    /// Fail the first `times` calls at `at`, then behave normally.
    #[must_use]
    pub fn fail_times(self, at: FailAt, kind: ErrorKind, times: u32) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(
                at,
                Injected {
                    kind,
                    remaining: times,
                },
            );
        }
        self
    }

    /// Total provider calls served, failures included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, at: &FailAt) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Ok(mut failures) = self.failures.lock() else {
            return Ok(());
        };
        if let Some(injected) = failures.get_mut(at)
            && injected.remaining > 0
        {
            injected.remaining -= 1;
            return Err(ProviderError::Injected {
                kind: injected.kind,
                message: format!("{at:?}"),
            });
        }
        Ok(())
    }

    fn find_dataset(&self, dataset_id: &str) -> Result<&MemoryDataset, ProviderError> {
        self.datasets
            .iter()
            .find(|d| d.name == dataset_id)
            .ok_or_else(|| ProviderError::Api {
                status: 404,
                message: format!("Not found: Dataset {}:{dataset_id}", self.project_id),
            })
    }

    fn paginate<T: Clone>(
        &self,
        items: &[T],
        page_token: Option<&str>,
    ) -> Result<Page<T>, ProviderError> {
        let start = match page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ProviderError::Parse(format!("bad page token: {token}")))?,
        };
        let end = (start + self.page_size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default().to_vec();
        let next_page_token = (end < items.len()).then(|| end.to_string());
        Ok(Page {
            items: slice,
            next_page_token,
        })
    }
}

impl CatalogProvider for InMemoryCatalog {
    async fn list_datasets(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<DatasetRef>, ProviderError> {
        self.check(&FailAt::ListDatasets)?;
        let refs: Vec<DatasetRef> = self
            .datasets
            .iter()
            .map(|d| DatasetRef {
                project_id: self.project_id.clone(),
                dataset_id: d.name.clone(),
            })
            .collect();
        self.paginate(&refs, page_token)
    }

    async fn dataset_metadata(
        &self,
        dataset: &DatasetRef,
    ) -> Result<DatasetMetadata, ProviderError> {
        self.check(&FailAt::DatasetMetadata(dataset.dataset_id.clone()))?;
        let found = self.find_dataset(&dataset.dataset_id)?;
        Ok(DatasetMetadata {
            description: found.description.clone(),
        })
    }

    async fn list_tables(
        &self,
        dataset: &DatasetRef,
        page_token: Option<&str>,
    ) -> Result<Page<TableRef>, ProviderError> {
        self.check(&FailAt::ListTables(dataset.dataset_id.clone()))?;
        let found = self.find_dataset(&dataset.dataset_id)?;
        let refs: Vec<TableRef> = found.tables.iter().map(|t| dataset.table(&t.name)).collect();
        self.paginate(&refs, page_token)
    }

    async fn table_metadata(&self, table: &TableRef) -> Result<TableMetadata, ProviderError> {
        self.check(&FailAt::TableMetadata(
            table.dataset_id.clone(),
            table.table_id.clone(),
        ))?;
        let dataset = self.find_dataset(&table.dataset_id)?;
        dataset
            .tables
            .iter()
            .find(|t| t.name == table.table_id)
            .map(|t| t.metadata.clone())
            .ok_or_else(|| ProviderError::Api {
                status: 404,
                message: format!("Not found: Table {}.{}", table.dataset_id, table.table_id),
            })
    }
}
