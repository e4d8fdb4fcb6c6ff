//! Building a warehouse provider from a project's stored credential.

use kat_config::WarehouseConfig;
use kat_secrets::CredentialStore;
use kat_warehouse::bigquery::BigQueryClient;

use crate::error::SyncError;

/// Fetch `project_id`'s service account key and build a BigQuery client.
///
/// `gcp_project` overrides the GCP project read; it defaults to the key's
/// own project. Runs before any transaction opens.
///
/// # Errors
///
/// Returns [`SyncError::Credential`] if the key is missing or invalid, or
/// [`SyncError::RemoteFetch`] if the HTTP client cannot be built.
pub async fn connect_bigquery(
    store: &CredentialStore,
    config: &WarehouseConfig,
    project_id: &str,
    gcp_project: Option<String>,
) -> Result<BigQueryClient, SyncError> {
    let key = store.fetch(project_id).await?;
    let client = BigQueryClient::with_service_account(config, key, gcp_project)?;
    tracing::debug!(project_id, gcp_project = client.project(), "warehouse client ready");
    Ok(client)
}
