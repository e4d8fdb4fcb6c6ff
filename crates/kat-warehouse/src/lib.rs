//! # kat-warehouse
//!
//! Read-only access to a remote warehouse catalog.
//!
//! A [`CatalogProvider`] enumerates datasets, their tables, and each table's
//! top-level columns. Listing is paginated; callers walk pages with
//! [`list_all_datasets`] and [`list_all_tables`]. Two providers ship here:
//! - [`bigquery::BigQueryClient`] for the BigQuery REST API
//! - [`memory::InMemoryCatalog`] for tests and dry runs
//!
//! Providers never write. Every error is classified transient or fatal (see
//! [`ErrorKind`]); [`retry::with_retry`] repeats transient ones.

pub mod auth;
pub mod bigquery;
pub mod memory;
pub mod retry;

mod error;
mod http;

pub use error::{ErrorKind, ProviderError};

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::retry::{RetryConfig, with_retry};

// ── Types ──────────────────────────────────────────────────────────

/// One page of a listing. `next_page_token` is `None` on the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }
}

/// Address of a remote dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    pub project_id: String,
    pub dataset_id: String,
}

/// Address of a remote table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl DatasetRef {
    /// Address of a table inside this dataset.
    #[must_use]
    pub fn table(&self, table_id: impl Into<String>) -> TableRef {
        TableRef {
            project_id: self.project_id.clone(),
            dataset_id: self.dataset_id.clone(),
            table_id: table_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub description: String,
}

/// A top-level schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Provider type name, verbatim (`STRING`, `INTEGER`, `RECORD`, ...).
    pub column_type: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub description: String,
    pub row_count: i64,
    pub columns: Vec<ColumnSchema>,
}

// ── Provider ───────────────────────────────────────────────────────

/// A remote source of catalog metadata.
///
/// Implementations must be cheap to share across tasks; the sync pipeline
/// calls them concurrently, one task per dataset.
pub trait CatalogProvider: Send + Sync {
    /// List datasets in the provider's project.
    fn list_datasets(
        &self,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<Page<DatasetRef>, ProviderError>> + Send;

    fn dataset_metadata(
        &self,
        dataset: &DatasetRef,
    ) -> impl Future<Output = Result<DatasetMetadata, ProviderError>> + Send;

    fn list_tables(
        &self,
        dataset: &DatasetRef,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<Page<TableRef>, ProviderError>> + Send;

    /// Description, row count and top-level columns of one table.
    fn table_metadata(
        &self,
        table: &TableRef,
    ) -> impl Future<Output = Result<TableMetadata, ProviderError>> + Send;
}

/// Walk every page of [`CatalogProvider::list_datasets`].
///
/// # Errors
///
/// Returns the first error that survives `retry`.
pub async fn list_all_datasets<P: CatalogProvider + ?Sized>(
    provider: &P,
    retry: &RetryConfig,
) -> Result<Vec<DatasetRef>, ProviderError> {
    let mut all = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = with_retry(retry, "list_datasets", || {
            provider.list_datasets(token.as_deref())
        })
        .await?;
        all.extend(page.items);
        match page.next_page_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }
    tracing::debug!(datasets = all.len(), "listed remote datasets");
    Ok(all)
}

/// Walk every page of [`CatalogProvider::list_tables`] for one dataset.
///
/// # Errors
///
/// Returns the first error that survives `retry`.
pub async fn list_all_tables<P: CatalogProvider + ?Sized>(
    provider: &P,
    dataset: &DatasetRef,
    retry: &RetryConfig,
) -> Result<Vec<TableRef>, ProviderError> {
    let mut all = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = with_retry(retry, "list_tables", || {
            provider.list_tables(dataset, token.as_deref())
        })
        .await?;
        all.extend(page.items);
        match page.next_page_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }
    tracing::debug!(dataset = %dataset.dataset_id, tables = all.len(), "listed remote tables");
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryCatalog, MemoryDataset, MemoryTable};
    use pretty_assertions::assert_eq;

    fn catalog() -> InMemoryCatalog {
        let mut sales = MemoryDataset::new("sales");
        for name in ["a", "b", "c", "d", "e"] {
            sales = sales.table(MemoryTable::new(name));
        }
        InMemoryCatalog::new("acme")
            .with_page_size(2)
            .dataset(sales)
            .dataset(MemoryDataset::new("marketing"))
            .dataset(MemoryDataset::new("finance"))
    }

    #[tokio::test]
    async fn walks_all_dataset_pages() {
        let datasets = list_all_datasets(&catalog(), &RetryConfig::none()).await.unwrap();
        let names: Vec<_> = datasets.iter().map(|d| d.dataset_id.as_str()).collect();
        assert_eq!(names, vec!["sales", "marketing", "finance"]);
    }

    #[tokio::test]
    async fn walks_all_table_pages() {
        let catalog = catalog();
        let sales = DatasetRef {
            project_id: "acme".into(),
            dataset_id: "sales".into(),
        };
        let tables = list_all_tables(&catalog, &sales, &RetryConfig::none()).await.unwrap();
        assert_eq!(tables.len(), 5);
        assert_eq!(tables[4], sales.table("e"));
    }
}
