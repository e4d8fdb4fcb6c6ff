//! Sync run repository. Rows are immutable once inserted, and each is
//! written in the same transaction as its changelog entries.

use chrono::{DateTime, Utc};
use kat_core::change::ChangeRecord;
use kat_core::entities::SyncRun;
use kat_core::ids::PREFIX_SYNC_RUN;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, parse_datetime};
use crate::repos::changelog::insert_entries;
use crate::{KatDb, id_expr};

fn row_to_sync_run(row: &libsql::Row) -> Result<SyncRun, DatabaseError> {
    Ok(SyncRun {
        id: row.get::<String>(0)?,
        project_id: row.get::<String>(1)?,
        started_at: parse_datetime(&row.get::<String>(2)?)?,
    })
}

async fn insert_run(
    tx: &libsql::Transaction,
    project_id: &str,
    started_at: DateTime<Utc>,
    records: &[ChangeRecord],
) -> Result<SyncRun, DatabaseError> {
    let sql = format!(
        "INSERT INTO sync_runs (id, project_id, started_at) VALUES ({}, ?1, ?2)
         RETURNING id, project_id, started_at",
        id_expr(PREFIX_SYNC_RUN)
    );
    let mut rows = tx
        .query(&sql, libsql::params![project_id, format_timestamp(started_at)])
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    let run = row_to_sync_run(&row)?;
    drop(rows);
    insert_entries(tx, &run.id, records).await?;
    Ok(run)
}

impl KatDb {
    /// Record a completed reconciliation together with its changelog.
    ///
    /// The sync run row and every entry are written in one transaction, so
    /// a run is never stored without the changes it observed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any insert fails (e.g. unknown project) or
    /// a record breaks the field-name rule. Neither the run nor any entry
    /// is kept in that case.
    pub async fn record_sync(
        &self,
        project_id: &str,
        started_at: DateTime<Utc>,
        records: &[ChangeRecord],
    ) -> Result<SyncRun, DatabaseError> {
        let _gate = self.lock_writes().await;
        let tx = self.conn().transaction().await?;
        match insert_run(&tx, project_id, started_at, records).await {
            Ok(run) => {
                tx.commit().await?;
                tracing::debug!(
                    project_id,
                    sync_run_id = %run.id,
                    entries = records.len(),
                    "sync run recorded"
                );
                Ok(run)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    tracing::warn!(project_id, error = %rb, "sync run rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Most recent sync runs of a project, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_sync_runs(
        &self,
        project_id: &str,
        limit: u32,
    ) -> Result<Vec<SyncRun>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, project_id, started_at FROM sync_runs
                 WHERE project_id = ?1
                 ORDER BY started_at DESC, rowid DESC LIMIT ?2",
                libsql::params![project_id, limit],
            )
            .await?;
        let mut runs = Vec::new();
        while let Some(row) = rows.next().await? {
            runs.push(row_to_sync_run(&row)?);
        }
        Ok(runs)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_sync_run(&self, id: &str) -> Result<Option<SyncRun>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, project_id, started_at FROM sync_runs WHERE id = ?1",
                libsql::params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_sync_run(&row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use kat_core::change::{ChangeRecord, EntityRef, Lineage};
    use kat_core::enums::EntityType;
    use pretty_assertions::assert_eq;

    use crate::test_support::helpers::test_db_with_project;

    fn new_dataset() -> ChangeRecord {
        ChangeRecord::insert(EntityType::Dataset, EntityRef::new("dst-1", "sales"), Lineage::root())
    }

    #[tokio::test]
    async fn list_is_newest_first_and_limited() {
        let db = test_db_with_project().await;
        let base = Utc::now();
        let mut created = Vec::new();
        for minutes in 0..7 {
            let run = db
                .record_sync("prj-test", base + Duration::minutes(minutes), &[])
                .await
                .unwrap();
            created.push(run);
        }

        let runs = db.list_sync_runs("prj-test", 5).await.unwrap();
        assert_eq!(runs.len(), 5);
        assert_eq!(runs[0].id, created[6].id);
        assert_eq!(runs[4].id, created[2].id);
        assert!(runs.iter().all(|r| r.id.starts_with("syn-")));
    }

    #[tokio::test]
    async fn run_and_entries_are_stored_together() {
        let db = test_db_with_project().await;
        let run = db.record_sync("prj-test", Utc::now(), &[new_dataset()]).await.unwrap();

        let entries = db.changelog_for_sync(&run.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sync_id, run.id);
        assert_eq!(entries[0].entity_name, "sales");
    }

    #[tokio::test]
    async fn failed_entry_insert_keeps_no_run() {
        let db = test_db_with_project().await;
        db.conn()
            .execute(
                "CREATE TRIGGER reject_entries BEFORE INSERT ON changelog_entries
                 BEGIN SELECT RAISE(ABORT, 'changelog unavailable'); END",
                (),
            )
            .await
            .unwrap();

        let result = db.record_sync("prj-test", Utc::now(), &[new_dataset()]).await;
        assert!(result.is_err());
        assert!(db.list_sync_runs("prj-test", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_record_keeps_no_run() {
        let db = test_db_with_project().await;
        let mut bad = new_dataset();
        bad.field_name = "name".into();

        assert!(db.record_sync("prj-test", Utc::now(), &[bad]).await.is_err());
        assert!(db.list_sync_runs("prj-test", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sync_run_for_unknown_project_fails() {
        let db = test_db_with_project().await;
        assert!(db.record_sync("prj-ghost", Utc::now(), &[]).await.is_err());
    }

    #[tokio::test]
    async fn sync_runs_cannot_be_updated() {
        let db = test_db_with_project().await;
        let run = db.record_sync("prj-test", Utc::now(), &[]).await.unwrap();
        let result = db
            .conn()
            .execute(
                "UPDATE sync_runs SET started_at = 'x' WHERE id = ?1",
                libsql::params![run.id.as_str()],
            )
            .await;
        assert!(result.is_err());
        assert_eq!(db.get_sync_run(&run.id).await.unwrap().unwrap(), run);
    }
}
