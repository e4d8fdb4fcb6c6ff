//! Sync error types for kat-sync.

use kat_core::errors::CoreError;
use kat_db::error::DatabaseError;
use kat_secrets::CredentialError;
use kat_warehouse::ProviderError;

/// Errors that fail a sync. Anything raised before commit rolls the
/// catalog transaction back.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The project's warehouse credential is missing or unusable.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("remote fetch failed: {0}")]
    RemoteFetch(#[from] ProviderError),

    #[error("persistence error: {0}")]
    Persistence(#[from] DatabaseError),

    /// Another sync of the same project holds the project lock.
    #[error("a sync of project {project_id} is already running")]
    AlreadyRunning { project_id: String },

    /// A fetch task panicked or the pipeline lost a message.
    #[error("fetch task failed: {0}")]
    TaskFailed(String),
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        Self::Persistence(DatabaseError::Core(err))
    }
}
