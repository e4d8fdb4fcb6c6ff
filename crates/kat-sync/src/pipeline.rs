//! Concurrent fetch, sequential write.
//!
//! One task per remote dataset fetches the dataset's metadata and every
//! table's metadata, sending each as a [`CatalogItem`] over a bounded
//! channel. A semaphore caps how many datasets are in flight. The caller's
//! task is the only consumer and the only user of the [`CatalogWriter`].
//!
//! A dataset's task always sends the dataset before any of its tables, so
//! the consumer can resolve each table's parent id. Items from different
//! datasets interleave freely.

use std::collections::HashMap;
use std::sync::Arc;

use kat_db::writer::CatalogWriter;
use kat_warehouse::retry::{RetryConfig, with_retry};
use kat_warehouse::{
    CatalogProvider, DatasetMetadata, DatasetRef, ProviderError, TableMetadata, list_all_datasets,
    list_all_tables,
};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};

use crate::error::SyncError;

/// Fan-out limits for one sync.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub max_concurrent_fetches: usize,
    pub channel_capacity: usize,
    pub retry: RetryConfig,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            channel_capacity: 256,
            retry: RetryConfig::default(),
        }
    }
}

/// A fetched remote entity on its way to the writer.
#[derive(Debug)]
pub enum CatalogItem {
    Dataset {
        name: String,
        metadata: DatasetMetadata,
    },
    /// A table with its top-level columns.
    Table {
        dataset: String,
        name: String,
        metadata: TableMetadata,
    },
}

/// Fetch the provider's whole catalog and upsert it through `writer`.
///
/// Returns the number of remote datasets seen.
///
/// # Errors
///
/// Returns the first provider, persistence or task error. Outstanding
/// fetch tasks are aborted; the caller must roll `writer` back.
pub async fn fetch_and_upsert<P>(
    provider: Arc<P>,
    writer: &mut CatalogWriter,
    settings: &FetchSettings,
) -> Result<usize, SyncError>
where
    P: CatalogProvider + 'static,
{
    let datasets = list_all_datasets(provider.as_ref(), &settings.retry).await?;
    let dataset_count = datasets.len();

    let (tx, mut rx) = mpsc::channel(settings.channel_capacity.max(1));
    let permits = Arc::new(Semaphore::new(settings.max_concurrent_fetches.max(1)));
    let mut tasks = JoinSet::new();

    for dataset in datasets {
        let provider = Arc::clone(&provider);
        let permits = Arc::clone(&permits);
        let tx = tx.clone();
        let retry = settings.retry.clone();
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return Ok(());
            };
            fetch_dataset(provider.as_ref(), &dataset, &retry, &tx).await
        });
    }
    drop(tx);

    let mut dataset_ids: HashMap<String, String> = HashMap::new();
    loop {
        tokio::select! {
            item = rx.recv() => match item {
                Some(item) => {
                    if let Err(e) = apply(writer, &mut dataset_ids, item).await {
                        tasks.abort_all();
                        return Err(e);
                    }
                }
                None => break,
            },
            Some(joined) = tasks.join_next() => {
                if let Err(e) = task_result(joined) {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        task_result(joined)?;
    }

    tracing::debug!(
        project_id = writer.project_id(),
        datasets = dataset_count,
        "remote catalog applied"
    );
    Ok(dataset_count)
}

fn task_result(joined: Result<Result<(), ProviderError>, JoinError>) -> Result<(), SyncError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SyncError::RemoteFetch(e)),
        Err(e) => Err(SyncError::TaskFailed(e.to_string())),
    }
}

/// Producer side: one dataset and all of its tables.
///
/// A closed channel means the consumer gave up; the task stops quietly.
async fn fetch_dataset<P: CatalogProvider + ?Sized>(
    provider: &P,
    dataset: &DatasetRef,
    retry: &RetryConfig,
    tx: &mpsc::Sender<CatalogItem>,
) -> Result<(), ProviderError> {
    let metadata =
        with_retry(retry, "dataset_metadata", || provider.dataset_metadata(dataset)).await?;
    let item = CatalogItem::Dataset {
        name: dataset.dataset_id.clone(),
        metadata,
    };
    if tx.send(item).await.is_err() {
        return Ok(());
    }

    for table in list_all_tables(provider, dataset, retry).await? {
        let metadata =
            with_retry(retry, "table_metadata", || provider.table_metadata(&table)).await?;
        let item = CatalogItem::Table {
            dataset: dataset.dataset_id.clone(),
            name: table.table_id.clone(),
            metadata,
        };
        if tx.send(item).await.is_err() {
            return Ok(());
        }
    }
    Ok(())
}

/// Consumer side: write one item.
async fn apply(
    writer: &mut CatalogWriter,
    dataset_ids: &mut HashMap<String, String>,
    item: CatalogItem,
) -> Result<(), SyncError> {
    match item {
        CatalogItem::Dataset { name, metadata } => {
            let id = writer.upsert_dataset(&name, &metadata.description).await?;
            dataset_ids.insert(name, id);
        }
        CatalogItem::Table {
            dataset,
            name,
            metadata,
        } => {
            let dataset_id = dataset_ids.get(&dataset).ok_or_else(|| {
                SyncError::TaskFailed(format!(
                    "table {dataset}.{name} arrived before its dataset"
                ))
            })?;
            let table_id = writer
                .upsert_table(dataset_id, &name, &metadata.description, metadata.row_count)
                .await?;
            for column in &metadata.columns {
                writer
                    .upsert_column(
                        &table_id,
                        &column.name,
                        &column.column_type,
                        &column.description,
                    )
                    .await?;
            }
        }
    }
    Ok(())
}
