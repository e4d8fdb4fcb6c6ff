//! Changelog repository.
//!
//! Entries are append-only. They are inserted by
//! [`KatDb::record_sync`](crate::KatDb::record_sync) in the same
//! transaction as their sync run, so a sync's audit trail is all-or-nothing.

use chrono::{DateTime, Utc};
use kat_core::change::ChangeRecord;
use kat_core::entities::ChangelogEntry;
use kat_core::enums::ChangeType;
use kat_core::errors::CoreError;
use kat_core::ids::PREFIX_CHANGELOG;
use serde::Serialize;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_opt_string, parse_datetime, parse_enum};
use crate::{KatDb, id_expr};

/// Changelog totals for a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangelogSummary {
    pub syncs: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
}

fn row_to_entry(row: &libsql::Row) -> Result<ChangelogEntry, DatabaseError> {
    Ok(ChangelogEntry {
        id: row.get::<String>(0)?,
        sync_id: row.get::<String>(1)?,
        change_type: parse_enum(&row.get::<String>(2)?)?,
        entity_type: parse_enum(&row.get::<String>(3)?)?,
        entity_id: row.get::<String>(4)?,
        entity_name: row.get::<String>(5)?,
        field_name: row.get::<String>(6)?,
        old_value: row.get::<String>(7)?,
        new_value: row.get::<String>(8)?,
        parent_id: get_opt_string(row, 9)?,
        parent_name: get_opt_string(row, 10)?,
        grandparent_id: get_opt_string(row, 11)?,
        grandparent_name: get_opt_string(row, 12)?,
        created_at: parse_datetime(&row.get::<String>(13)?)?,
    })
}

pub(crate) async fn insert_entries(
    tx: &libsql::Transaction,
    sync_id: &str,
    records: &[ChangeRecord],
) -> Result<usize, DatabaseError> {
    let sql = format!(
        "INSERT INTO changelog_entries (
             id, sync_id, change_type, entity_type, entity_id, entity_name,
             field_name, old_value, new_value,
             parent_id, parent_name, grandparent_id, grandparent_name, created_at)
         VALUES ({}, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        id_expr(PREFIX_CHANGELOG)
    );
    let created_at = format_timestamp(Utc::now());
    for record in records {
        if !record.is_well_formed() {
            return Err(CoreError::InvalidChange(format!(
                "{} of {} {} with field '{}'",
                record.change_type, record.entity_type, record.entity.id, record.field_name
            ))
            .into());
        }
        let parent = record.lineage.parent.as_ref();
        let grandparent = record.lineage.grandparent.as_ref();
        tx.execute(
            &sql,
            libsql::params![
                sync_id,
                record.change_type.as_str(),
                record.entity_type.as_str(),
                record.entity.id.as_str(),
                record.entity.name.as_str(),
                record.field_name.as_str(),
                record.old_value.as_str(),
                record.new_value.as_str(),
                parent.map(|p| p.id.as_str()),
                parent.map(|p| p.name.as_str()),
                grandparent.map(|g| g.id.as_str()),
                grandparent.map(|g| g.name.as_str()),
                created_at.as_str()
            ],
        )
        .await?;
    }
    Ok(records.len())
}

impl KatDb {
    /// All entries of one sync, in recording order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn changelog_for_sync(
        &self,
        sync_id: &str,
    ) -> Result<Vec<ChangelogEntry>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, sync_id, change_type, entity_type, entity_id, entity_name,
                        field_name, old_value, new_value,
                        parent_id, parent_name, grandparent_id, grandparent_name, created_at
                 FROM changelog_entries WHERE sync_id = ?1 ORDER BY rowid",
                libsql::params![sync_id],
            )
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }

    /// Count syncs and entries per change type, optionally since a point in time.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails.
    pub async fn changelog_summary(
        &self,
        project_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<ChangelogSummary, DatabaseError> {
        let since = since.map_or_else(String::new, format_timestamp);
        let mut summary = ChangelogSummary::default();

        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM sync_runs WHERE project_id = ?1 AND started_at >= ?2",
                libsql::params![project_id, since.as_str()],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            summary.syncs = u64::try_from(row.get::<i64>(0)?).unwrap_or_default();
        }

        let mut rows = self
            .conn()
            .query(
                "SELECT c.change_type, COUNT(*)
                 FROM changelog_entries c JOIN sync_runs s ON s.id = c.sync_id
                 WHERE s.project_id = ?1 AND s.started_at >= ?2
                 GROUP BY c.change_type",
                libsql::params![project_id, since.as_str()],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let count = u64::try_from(row.get::<i64>(1)?).unwrap_or_default();
            match parse_enum::<ChangeType>(&row.get::<String>(0)?)? {
                ChangeType::Insert => summary.inserts = count,
                ChangeType::Update => summary.updates = count,
                ChangeType::Delete => summary.deletes = count,
            }
        }
        Ok(summary)
    }
}
