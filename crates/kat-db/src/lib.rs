//! # kat-db
//!
//! libSQL storage for the Katalog catalog and its audit trail.
//!
//! - [`KatDb`] owns the database and its single connection.
//! - [`writer::CatalogWriter`] applies a remote catalog with mark-and-sweep
//!   semantics inside one transaction.
//! - `repos` adds snapshot loading, project bootstrap, sync runs and the
//!   changelog as `impl KatDb` blocks.
//!
//! Writes are serialized through a process-wide gate. SQLite allows one
//! open transaction per connection, and a statement issued on the shared
//! connection while another caller's transaction is open would silently
//! join it.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod writer;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;

use error::DatabaseError;
use libsql::Builder;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Central database handle for all Katalog state.
pub struct KatDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    write_gate: Arc<Mutex<()>>,
}

impl KatDb {
    /// Open a local database at the given path, creating parent directories.
    ///
    /// `":memory:"` opens a private in-memory store. Runs migrations
    /// automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        if path != ":memory:"
            && let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let kat_db = Self {
            db,
            conn,
            write_gate: Arc::new(Mutex::new(())),
        };
        kat_db.run_migrations().await?;
        tracing::debug!(path, "catalog database opened");
        Ok(kat_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Wait for exclusive write access.
    pub(crate) async fn lock_writes(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.write_gate).lock_owned().await
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"syn-a3f8b2c1d4e5f607"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(&format!("SELECT {}", id_expr(prefix)), ())
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}

/// SQL expression producing a fresh `"{prefix}-{16 hex}"` id.
pub(crate) fn id_expr(prefix: &str) -> String {
    format!("'{prefix}-' || lower(hex(randomblob(8)))")
}
