//! # kat-secrets
//!
//! Retrieval of per-project warehouse credentials.
//!
//! Each project's service account key lives in object storage at
//! `<prefix>/<project_id>/sa_key`. Uploading keys is handled elsewhere;
//! this crate only reads and parses them.

mod error;
mod key;

pub use error::CredentialError;
pub use key::ServiceAccountKey;

use std::sync::Arc;

use kat_config::{StorageBackend, StorageConfig};
use object_store::{
    ObjectStore, aws::AmazonS3Builder, gcp::GoogleCloudStorageBuilder,
    local::LocalFileSystem, memory::InMemory, path::Path,
};

/// Object name of the key blob under each project directory.
const KEY_OBJECT: &str = "sa_key";

/// Reads service account keys from an object store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl CredentialStore {
    /// Wrap an existing object store.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    /// Build the store selected by `[storage]`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NotConfigured` if the backend lacks required
    /// fields, or `CredentialError::Storage` if the client cannot be built.
    pub fn from_config(config: &StorageConfig) -> Result<Self, CredentialError> {
        if !config.is_configured() {
            return Err(CredentialError::NotConfigured(format!(
                "{:?} backend needs a bucket or local_root",
                config.backend
            )));
        }

        let store: Arc<dyn ObjectStore> = match config.backend {
            StorageBackend::Gcs => {
                let mut builder =
                    GoogleCloudStorageBuilder::from_env().with_bucket_name(&config.bucket);
                if !config.service_account_path.is_empty() {
                    builder = builder.with_service_account_path(&config.service_account_path);
                }
                Arc::new(builder.build()?)
            }
            StorageBackend::S3 => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);
                if !config.region.is_empty() {
                    builder = builder.with_region(&config.region);
                }
                if !config.endpoint.is_empty() {
                    builder = builder.with_endpoint(&config.endpoint);
                }
                Arc::new(builder.build()?)
            }
            StorageBackend::Local => {
                Arc::new(LocalFileSystem::new_with_prefix(&config.local_root)?)
            }
            StorageBackend::Memory => Arc::new(InMemory::new()),
        };

        tracing::debug!(
            backend = ?config.backend,
            prefix = %config.prefix,
            "credential store ready"
        );
        Ok(Self::new(store, config.prefix.clone()))
    }

    /// Object path of a project's key.
    #[must_use]
    pub fn key_path(&self, project_id: &str) -> Path {
        if self.prefix.is_empty() {
            Path::from(format!("{project_id}/{KEY_OBJECT}"))
        } else {
            Path::from(format!("{}/{project_id}/{KEY_OBJECT}", self.prefix))
        }
    }

    /// Fetch and parse the key for `project_id`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Missing` when no blob exists, or a parse /
    /// validation error when the blob is not a usable service account key.
    pub async fn fetch(&self, project_id: &str) -> Result<ServiceAccountKey, CredentialError> {
        let path = self.key_path(project_id);
        let bytes = match self.store.get(&path).await {
            Ok(result) => result.bytes().await?,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(CredentialError::Missing {
                    project_id: project_id.to_string(),
                    path: path.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let key = ServiceAccountKey::from_slice(project_id, &bytes)?;
        tracing::debug!(project_id, client_email = %key.client_email, "loaded service account key");
        Ok(key)
    }

    /// Write raw key bytes for `project_id`. Seeds in-memory stores in tests.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Storage` if the write fails.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn put_raw(&self, project_id: &str, bytes: Vec<u8>) -> Result<(), CredentialError> {
        self.store
            .put(
                &self.key_path(project_id),
                object_store::PutPayload::from(bytes),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::fixtures::KEY_JSON;
    use kat_config::StorageConfig;
    use pretty_assertions::assert_eq;

    fn memory_store(prefix: &str) -> CredentialStore {
        CredentialStore::new(Arc::new(InMemory::new()), prefix)
    }

    #[test]
    fn key_path_includes_prefix() {
        assert_eq!(memory_store("").key_path("prj-1").as_ref(), "prj-1/sa_key");
        assert_eq!(
            memory_store("/tenants/").key_path("prj-1").as_ref(),
            "tenants/prj-1/sa_key"
        );
    }

    #[tokio::test]
    async fn fetch_parses_stored_key() {
        let store = memory_store("keys");
        store.put_raw("prj-1", KEY_JSON.as_bytes().to_vec()).await.unwrap();

        let key = store.fetch("prj-1").await.unwrap();
        assert_eq!(key.project_id, "acme-analytics");
    }

    #[tokio::test]
    async fn fetch_missing_project_is_missing() {
        let store = memory_store("keys");
        let err = store.fetch("prj-404").await.unwrap_err();
        match err {
            CredentialError::Missing { project_id, path } => {
                assert_eq!(project_id, "prj-404");
                assert_eq!(path, "keys/prj-404/sa_key");
            }
            other => panic!("expected Missing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_rejects_corrupt_blob() {
        let store = memory_store("");
        store.put_raw("prj-1", b"{\"type\":".to_vec()).await.unwrap();
        assert!(matches!(
            store.fetch("prj-1").await,
            Err(CredentialError::Unparseable { .. })
        ));
    }

    #[tokio::test]
    async fn local_backend_reads_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let key_dir = dir.path().join("prj-7");
        std::fs::create_dir_all(&key_dir).unwrap();
        std::fs::write(key_dir.join("sa_key"), KEY_JSON).unwrap();

        let config = StorageConfig {
            backend: StorageBackend::Local,
            local_root: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        let store = CredentialStore::from_config(&config).unwrap();
        let key = store.fetch("prj-7").await.unwrap();
        assert_eq!(key.client_id, "1234567890");
    }

    #[test]
    fn unconfigured_backend_is_rejected() {
        let err = CredentialStore::from_config(&StorageConfig::default()).unwrap_err();
        assert!(matches!(err, CredentialError::NotConfigured(_)));
    }
}
