//! Mark-and-sweep catalog writer.
//!
//! A [`CatalogWriter`] owns one libSQL transaction for one project:
//!
//! 1. [`KatDb::begin_catalog_write`] takes the write gate and opens the transaction.
//! 2. [`CatalogWriter::mark_pending`] records every dataset, table and column
//!    id currently stored under the project.
//! 3. `upsert_*` insert or update by natural key and mark the id as seen.
//! 4. [`CatalogWriter::sweep`] deletes everything pending and not seen.
//! 5. [`CatalogWriter::commit`] or [`CatalogWriter::rollback`].
//!
//! The pending-removal set never touches disk. Dropping the writer without
//! committing rolls the transaction back.

use std::collections::HashSet;

use chrono::Utc;
use kat_core::enums::EntityType;
use kat_core::ids::{PREFIX_COLUMN, PREFIX_DATASET, PREFIX_TABLE};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, placeholders};
use crate::{KatDb, id_expr};

/// Ids per `DELETE ... IN (...)` statement.
const DELETE_CHUNK: usize = 500;

/// Ids of entities removed by a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub datasets: Vec<String>,
    pub tables: Vec<String>,
    pub columns: Vec<String>,
}

impl SweepReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty() && self.tables.is_empty() && self.columns.is_empty()
    }

    /// Every removed id, columns first.
    pub fn all_ids(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .chain(&self.tables)
            .chain(&self.datasets)
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len() + self.tables.len() + self.columns.len()
    }
}

/// Number of upsert calls applied, by level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub datasets: usize,
    pub tables: usize,
    pub columns: usize,
}

#[derive(Debug, Default)]
struct IdSets {
    datasets: HashSet<String>,
    tables: HashSet<String>,
    columns: HashSet<String>,
}

impl IdSets {
    fn get_mut(&mut self, entity: EntityType) -> &mut HashSet<String> {
        match entity {
            EntityType::Dataset => &mut self.datasets,
            EntityType::Table => &mut self.tables,
            EntityType::Column => &mut self.columns,
        }
    }
}

/// Transactional writer for one project's catalog.
pub struct CatalogWriter {
    tx: libsql::Transaction,
    _gate: OwnedMutexGuard<()>,
    project_id: String,
    existing: Option<IdSets>,
    seen: IdSets,
    counts: UpsertCounts,
}

impl KatDb {
    /// Open a write transaction for `project_id`.
    ///
    /// Waits for any other writer to finish first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the project does not exist,
    /// or the libSQL error if the transaction cannot start.
    pub async fn begin_catalog_write(
        &self,
        project_id: &str,
    ) -> Result<CatalogWriter, DatabaseError> {
        if self.get_project(project_id).await?.is_none() {
            return Err(DatabaseError::InvalidState(format!(
                "project {project_id} does not exist"
            )));
        }
        let gate = self.lock_writes().await;
        let tx = self.conn().transaction().await?;
        tracing::debug!(project_id, "catalog write transaction opened");
        Ok(CatalogWriter {
            tx,
            _gate: gate,
            project_id: project_id.to_string(),
            existing: None,
            seen: IdSets::default(),
            counts: UpsertCounts::default(),
        })
    }
}

impl CatalogWriter {
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub const fn counts(&self) -> UpsertCounts {
        self.counts
    }

    /// Record the ids currently stored under the project as pending removal.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails, or `InvalidState` if called twice.
    pub async fn mark_pending(&mut self) -> Result<(), DatabaseError> {
        if self.existing.is_some() {
            return Err(DatabaseError::InvalidState("mark_pending called twice".into()));
        }
        let mut existing = IdSets::default();
        for (entity, sql) in [
            (EntityType::Dataset, "SELECT id FROM datasets WHERE project_id = ?1"),
            (
                EntityType::Table,
                "SELECT t.id FROM tables t JOIN datasets d ON d.id = t.dataset_id
                 WHERE d.project_id = ?1",
            ),
            (
                EntityType::Column,
                "SELECT c.id FROM columns c
                 JOIN tables t ON t.id = c.table_id
                 JOIN datasets d ON d.id = t.dataset_id
                 WHERE d.project_id = ?1",
            ),
        ] {
            let mut rows = self.tx.query(sql, libsql::params![self.project_id.as_str()]).await?;
            let set = existing.get_mut(entity);
            while let Some(row) = rows.next().await? {
                set.insert(row.get::<String>(0)?);
            }
        }
        tracing::debug!(
            project_id = %self.project_id,
            datasets = existing.datasets.len(),
            tables = existing.tables.len(),
            columns = existing.columns.len(),
            "marked catalog pending removal"
        );
        self.existing = Some(existing);
        Ok(())
    }

    fn ensure_marked(&self) -> Result<(), DatabaseError> {
        if self.existing.is_none() {
            return Err(DatabaseError::InvalidState(
                "upsert before mark_pending".into(),
            ));
        }
        Ok(())
    }

    async fn upsert_returning_id(
        &mut self,
        entity: EntityType,
        sql: &str,
        params: Vec<libsql::Value>,
    ) -> Result<String, DatabaseError> {
        self.ensure_marked()?;
        let mut rows = self.tx.query(sql, libsql::params_from_iter(params)).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let id = row.get::<String>(0)?;
        self.seen.get_mut(entity).insert(id.clone());
        Ok(id)
    }

    /// Insert or update a dataset by `(name, project_id)`. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on constraint violations or query failure.
    pub async fn upsert_dataset(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<String, DatabaseError> {
        let sql = format!(
            "INSERT INTO datasets (id, name, project_id, description, created_at, updated_at)
             VALUES ({}, ?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(name, project_id) DO UPDATE SET
                 description = excluded.description,
                 updated_at = excluded.updated_at
             RETURNING id",
            id_expr(PREFIX_DATASET)
        );
        let params: Vec<libsql::Value> = vec![
            name.into(),
            self.project_id.clone().into(),
            description.into(),
            format_timestamp(Utc::now()).into(),
        ];
        let id = self.upsert_returning_id(EntityType::Dataset, &sql, params).await?;
        self.counts.datasets += 1;
        Ok(id)
    }

    /// Insert or update a table by `(name, dataset_id)`. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on constraint violations or query failure.
    pub async fn upsert_table(
        &mut self,
        dataset_id: &str,
        name: &str,
        description: &str,
        row_count: i64,
    ) -> Result<String, DatabaseError> {
        let sql = format!(
            "INSERT INTO tables (id, name, dataset_id, description, row_count, created_at, updated_at)
             VALUES ({}, ?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(name, dataset_id) DO UPDATE SET
                 description = excluded.description,
                 row_count = excluded.row_count,
                 updated_at = excluded.updated_at
             RETURNING id",
            id_expr(PREFIX_TABLE)
        );
        let params: Vec<libsql::Value> = vec![
            name.into(),
            dataset_id.into(),
            description.into(),
            row_count.into(),
            format_timestamp(Utc::now()).into(),
        ];
        let id = self.upsert_returning_id(EntityType::Table, &sql, params).await?;
        self.counts.tables += 1;
        Ok(id)
    }

    /// Insert or update a column by `(name, table_id)`. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on constraint violations or query failure.
    pub async fn upsert_column(
        &mut self,
        table_id: &str,
        name: &str,
        column_type: &str,
        description: &str,
    ) -> Result<String, DatabaseError> {
        let sql = format!(
            "INSERT INTO columns (id, name, table_id, column_type, description, created_at, updated_at)
             VALUES ({}, ?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(name, table_id) DO UPDATE SET
                 column_type = excluded.column_type,
                 description = excluded.description,
                 updated_at = excluded.updated_at
             RETURNING id",
            id_expr(PREFIX_COLUMN)
        );
        let params: Vec<libsql::Value> = vec![
            name.into(),
            table_id.into(),
            column_type.into(),
            description.into(),
            format_timestamp(Utc::now()).into(),
        ];
        let id = self.upsert_returning_id(EntityType::Column, &sql, params).await?;
        self.counts.columns += 1;
        Ok(id)
    }

    /// Ids marked pending and not seen since, sorted.
    fn unseen(&self, entity: EntityType) -> Vec<String> {
        let Some(existing) = &self.existing else {
            return Vec::new();
        };
        let (existing, seen) = match entity {
            EntityType::Dataset => (&existing.datasets, &self.seen.datasets),
            EntityType::Table => (&existing.tables, &self.seen.tables),
            EntityType::Column => (&existing.columns, &self.seen.columns),
        };
        let mut ids: Vec<String> = existing.difference(seen).cloned().collect();
        ids.sort();
        ids
    }

    /// Delete every column, table and dataset still pending removal.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a delete fails, or `InvalidState` if
    /// `mark_pending` was never called.
    pub async fn sweep(&mut self) -> Result<SweepReport, DatabaseError> {
        self.ensure_marked()?;
        let report = SweepReport {
            datasets: self.unseen(EntityType::Dataset),
            tables: self.unseen(EntityType::Table),
            columns: self.unseen(EntityType::Column),
        };

        for (table, ids) in [
            ("columns", &report.columns),
            ("tables", &report.tables),
            ("datasets", &report.datasets),
        ] {
            for chunk in ids.chunks(DELETE_CHUNK) {
                let sql = format!(
                    "DELETE FROM {table} WHERE id IN ({})",
                    placeholders(0, chunk.len())
                );
                self.tx
                    .execute(&sql, libsql::params_from_iter(chunk.iter().map(String::as_str)))
                    .await?;
            }
        }

        tracing::debug!(
            project_id = %self.project_id,
            datasets = report.datasets.len(),
            tables = report.tables.len(),
            columns = report.columns.len(),
            "swept catalog"
        );
        Ok(report)
    }

    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the commit fails; nothing is persisted then.
    pub async fn commit(self) -> Result<UpsertCounts, DatabaseError> {
        self.tx.commit().await?;
        tracing::debug!(project_id = %self.project_id, "catalog write committed");
        Ok(self.counts)
    }

    /// Discard every change made through this writer.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the rollback statement fails.
    pub async fn rollback(self) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        tracing::debug!(project_id = %self.project_id, "catalog write rolled back");
        Ok(())
    }
}
