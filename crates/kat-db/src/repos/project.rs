//! Project bootstrap. Projects are otherwise managed outside Katalog.

use chrono::Utc;
use kat_core::entities::Project;

use crate::KatDb;
use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, parse_datetime};

fn row_to_project(row: &libsql::Row) -> Result<Project, DatabaseError> {
    Ok(Project {
        id: row.get::<String>(0)?,
        name: row.get::<String>(1)?,
        created_at: parse_datetime(&row.get::<String>(2)?)?,
    })
}

impl KatDb {
    /// Create the project if it does not exist and return it.
    ///
    /// An existing project keeps its original name.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert or lookup fails.
    pub async fn ensure_project(&self, id: &str, name: &str) -> Result<Project, DatabaseError> {
        {
            let _gate = self.lock_writes().await;
            self.conn()
                .execute(
                    "INSERT INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO NOTHING",
                    libsql::params![id, name, format_timestamp(Utc::now())],
                )
                .await?;
        }
        self.get_project(id).await?.ok_or(DatabaseError::NoResult)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, name, created_at FROM projects WHERE id = ?1",
                libsql::params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_project(&row)?)),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_projects(&self) -> Result<Vec<Project>, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT id, name, created_at FROM projects ORDER BY id", ())
            .await?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next().await? {
            projects.push(row_to_project(&row)?);
        }
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::helpers::test_db;

    #[tokio::test]
    async fn ensure_project_is_idempotent() {
        let db = test_db().await;
        let first = db.ensure_project("prj-acme", "Acme").await.unwrap();
        let second = db.ensure_project("prj-acme", "Renamed").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.name, "Acme");
        assert_eq!(db.list_projects().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_name_violates_check() {
        let db = test_db().await;
        assert!(db.ensure_project("prj-x", "").await.is_err());
    }

    #[tokio::test]
    async fn unknown_project_is_none() {
        let db = test_db().await;
        assert!(db.get_project("prj-missing").await.unwrap().is_none());
    }
}
