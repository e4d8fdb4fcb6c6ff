//! # kat-search
//!
//! Resource search index for Katalog.
//!
//! Every dataset, table and column of a project is mirrored into a
//! Meilisearch index as a flat [`documents::ResourceDocument`]. The index
//! trails the relational store: [`synchronizer::IndexSynchronizer`] pushes
//! a committed snapshot and deletes swept ids, and callers treat its
//! failures as non-fatal.
//!
//! - [`meilisearch::MeilisearchClient`] talks to a Meilisearch server
//! - [`memory::InMemoryIndex`] backs tests

pub mod documents;
pub mod meilisearch;
pub mod memory;
pub mod query;
pub mod synchronizer;

mod error;

pub use error::SearchError;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::documents::ResourceDocument;
use crate::query::SearchRequest;

/// Receipt for an enqueued index task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub task_uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A document index holding catalog resources.
pub trait SearchIndex: Send + Sync {
    /// Add or replace documents keyed by `primary_key`.
    fn add_documents(
        &self,
        documents: &[ResourceDocument],
        primary_key: &str,
    ) -> impl Future<Output = Result<TaskInfo, SearchError>> + Send;

    fn delete_documents(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<TaskInfo, SearchError>> + Send;

    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<Vec<ResourceDocument>, SearchError>> + Send;
}
