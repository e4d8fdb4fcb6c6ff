//! In-memory image of a project's full catalog hierarchy.
//!
//! A snapshot is read from the store before and after a sync; the two
//! images are diffed to produce the changelog. Sibling lists are ordered
//! by entity id.

use serde::{Deserialize, Serialize};

use crate::entities::{Column, Dataset, Table};

/// Complete catalog of one project at a point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub project_id: String,
    pub datasets: Vec<DatasetNode>,
}

/// A dataset with its tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetNode {
    pub dataset: Dataset,
    pub tables: Vec<TableNode>,
}

/// A table with its columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableNode {
    pub table: Table,
    pub columns: Vec<Column>,
}

/// Entity counts across a snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotCounts {
    pub datasets: usize,
    pub tables: usize,
    pub columns: usize,
}

impl CatalogSnapshot {
    /// An empty catalog for `project_id`.
    #[must_use]
    pub fn empty(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            datasets: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Count datasets, tables and columns.
    #[must_use]
    pub fn counts(&self) -> SnapshotCounts {
        let mut counts = SnapshotCounts {
            datasets: self.datasets.len(),
            ..SnapshotCounts::default()
        };
        for ds in &self.datasets {
            counts.tables += ds.tables.len();
            counts.columns += ds.tables.iter().map(|t| t.columns.len()).sum::<usize>();
        }
        counts
    }

    /// Find a dataset node by name.
    #[must_use]
    pub fn dataset_by_name(&self, name: &str) -> Option<&DatasetNode> {
        self.datasets.iter().find(|d| d.dataset.name == name)
    }

    /// Sort every sibling list by id, the order the store returns them in.
    pub fn sort_by_id(&mut self) {
        self.datasets.sort_by(|a, b| a.dataset.id.cmp(&b.dataset.id));
        for ds in &mut self.datasets {
            ds.tables.sort_by(|a, b| a.table.id.cmp(&b.table.id));
            for table in &mut ds.tables {
                table.columns.sort_by(|a, b| a.id.cmp(&b.id));
            }
        }
    }
}

impl DatasetNode {
    /// Find a table node by name.
    #[must_use]
    pub fn table_by_name(&self, name: &str) -> Option<&TableNode> {
        self.tables.iter().find(|t| t.table.name == name)
    }
}

impl TableNode {
    /// Find a column by name.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}
