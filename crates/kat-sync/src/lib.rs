//! # kat-sync
//!
//! Reconciles a project's stored catalog with its remote warehouse.
//!
//! - [`reconciler::diff`] computes field-level changes between snapshots
//! - [`recorder::ChangelogRecorder`] persists them as the audit trail
//! - [`pipeline::fetch_and_upsert`] fans remote fetches out and funnels
//!   writes into one transaction
//! - [`orchestrator::Syncer`] runs the whole sync under a per-project lock
//! - [`source::connect_bigquery`] turns a stored credential into a provider

pub mod locks;
pub mod orchestrator;
pub mod pipeline;
pub mod reconciler;
pub mod recorder;
pub mod source;

mod error;

pub use error::SyncError;
pub use orchestrator::{IndexStatus, SyncOutcome, SyncSettings, Syncer};
