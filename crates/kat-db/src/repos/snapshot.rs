//! Snapshot loader: the full persisted hierarchy of one project.
//!
//! Three ordered queries (datasets, tables, columns) are stitched into a
//! [`CatalogSnapshot`]. Every sibling list comes back ordered by id.

use std::collections::HashMap;

use kat_core::entities::{Column, Dataset, Table};
use kat_core::snapshot::{CatalogSnapshot, DatasetNode, TableNode};

use crate::KatDb;
use crate::error::DatabaseError;
use crate::helpers::parse_datetime;

fn row_to_dataset(row: &libsql::Row) -> Result<Dataset, DatabaseError> {
    Ok(Dataset {
        id: row.get::<String>(0)?,
        name: row.get::<String>(1)?,
        project_id: row.get::<String>(2)?,
        description: row.get::<String>(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        updated_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

fn row_to_table(row: &libsql::Row) -> Result<Table, DatabaseError> {
    Ok(Table {
        id: row.get::<String>(0)?,
        name: row.get::<String>(1)?,
        dataset_id: row.get::<String>(2)?,
        description: row.get::<String>(3)?,
        row_count: row.get::<i64>(4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

fn row_to_column(row: &libsql::Row) -> Result<Column, DatabaseError> {
    Ok(Column {
        id: row.get::<String>(0)?,
        name: row.get::<String>(1)?,
        table_id: row.get::<String>(2)?,
        column_type: row.get::<String>(3)?,
        description: row.get::<String>(4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

impl KatDb {
    /// Load the committed catalog of `project_id`.
    ///
    /// An unknown project yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any query fails or a row cannot be parsed.
    pub async fn load_snapshot(&self, project_id: &str) -> Result<CatalogSnapshot, DatabaseError> {
        let mut datasets = Vec::new();
        let mut dataset_index = HashMap::new();
        let mut rows = self
            .conn()
            .query(
                "SELECT id, name, project_id, description, created_at, updated_at
                 FROM datasets WHERE project_id = ?1 ORDER BY id",
                libsql::params![project_id],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let dataset = row_to_dataset(&row)?;
            dataset_index.insert(dataset.id.clone(), datasets.len());
            datasets.push(DatasetNode {
                dataset,
                tables: Vec::new(),
            });
        }

        // (dataset position, table position) by table id
        let mut table_index: HashMap<String, (usize, usize)> = HashMap::new();
        let mut rows = self
            .conn()
            .query(
                "SELECT t.id, t.name, t.dataset_id, t.description, t.row_count, t.created_at, t.updated_at
                 FROM tables t JOIN datasets d ON d.id = t.dataset_id
                 WHERE d.project_id = ?1 ORDER BY t.id",
                libsql::params![project_id],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let table = row_to_table(&row)?;
            let ds_pos = *dataset_index.get(&table.dataset_id).ok_or_else(|| {
                DatabaseError::InvalidState(format!("table {} has no dataset", table.id))
            })?;
            let node = &mut datasets[ds_pos];
            table_index.insert(table.id.clone(), (ds_pos, node.tables.len()));
            node.tables.push(TableNode {
                table,
                columns: Vec::new(),
            });
        }

        let mut rows = self
            .conn()
            .query(
                "SELECT c.id, c.name, c.table_id, c.column_type, c.description, c.created_at, c.updated_at
                 FROM columns c
                 JOIN tables t ON t.id = c.table_id
                 JOIN datasets d ON d.id = t.dataset_id
                 WHERE d.project_id = ?1 ORDER BY c.id",
                libsql::params![project_id],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let column = row_to_column(&row)?;
            let (ds_pos, t_pos) = *table_index.get(&column.table_id).ok_or_else(|| {
                DatabaseError::InvalidState(format!("column {} has no table", column.id))
            })?;
            datasets[ds_pos].tables[t_pos].columns.push(column);
        }

        let snapshot = CatalogSnapshot {
            project_id: project_id.to_string(),
            datasets,
        };
        let counts = snapshot.counts();
        tracing::debug!(
            project_id,
            datasets = counts.datasets,
            tables = counts.tables,
            columns = counts.columns,
            "loaded catalog snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::helpers::{seed_catalog, test_db_with_project};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn unknown_project_is_empty() {
        let db = test_db_with_project().await;
        let snap = db.load_snapshot("prj-nope").await.unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.project_id, "prj-nope");
    }

    #[tokio::test]
    async fn loads_nested_hierarchy() {
        let db = test_db_with_project().await;
        seed_catalog(&db).await;

        let snap = db.load_snapshot("prj-test").await.unwrap();
        let counts = snap.counts();
        assert_eq!((counts.datasets, counts.tables, counts.columns), (2, 2, 3));

        let sales = snap.dataset_by_name("sales").unwrap();
        assert_eq!(sales.dataset.description, "Sales data");
        let orders = sales.table_by_name("orders").unwrap();
        assert_eq!(orders.table.row_count, 10);
        assert_eq!(orders.column_by_name("amount").unwrap().column_type, "NUMERIC");
        assert!(snap.dataset_by_name("marketing").unwrap().tables.is_empty());
    }

    #[tokio::test]
    async fn siblings_are_ordered_by_id() {
        let db = test_db_with_project().await;
        seed_catalog(&db).await;

        let snap = db.load_snapshot("prj-test").await.unwrap();
        let mut sorted = snap.clone();
        sorted.sort_by_id();
        assert_eq!(snap, sorted);
    }
}
