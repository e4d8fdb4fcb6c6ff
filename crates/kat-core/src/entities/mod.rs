//! Entity structs for the persisted catalog and its audit trail.
//!
//! Each entity maps to a table in the libSQL database (see
//! `kat-db/migrations/001_catalog.sql`).

mod catalog;
mod changelog;
mod project;
mod sync_run;

pub use catalog::{Column, Dataset, Table};
pub use changelog::ChangelogEntry;
pub use project::Project;
pub use sync_run::SyncRun;
