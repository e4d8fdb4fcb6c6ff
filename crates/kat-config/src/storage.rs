//! Object storage holding per-project warehouse credentials.

use serde::{Deserialize, Serialize};

/// Which object store backs the credential blobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Gcs,
    S3,
    Local,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Bucket name for `gcs` and `s3`.
    #[serde(default)]
    pub bucket: String,

    /// Key prefix prepended to `<project_id>/sa_key`.
    #[serde(default)]
    pub prefix: String,

    /// Root directory for the `local` backend.
    #[serde(default)]
    pub local_root: String,

    /// Service account file used to authenticate against GCS. Falls back to
    /// `GOOGLE_APPLICATION_CREDENTIALS` when empty.
    #[serde(default)]
    pub service_account_path: String,

    /// Custom S3 endpoint (MinIO, R2). Empty uses AWS.
    #[serde(default)]
    pub endpoint: String,

    /// S3 region. Empty defers to the `AWS_REGION` environment.
    #[serde(default)]
    pub region: String,
}

impl StorageConfig {
    /// Check if the selected backend has the fields it needs.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        match self.backend {
            StorageBackend::Gcs | StorageBackend::S3 => !self.bucket.is_empty(),
            StorageBackend::Local => !self.local_root.is_empty(),
            StorageBackend::Memory => true,
        }
    }
}
