use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    /// Storage is not set up for the selected backend.
    #[error("credential storage is not configured: {0}")]
    NotConfigured(String),

    /// No credential blob exists for the project.
    #[error("no credential stored for project '{project_id}' at '{path}'")]
    Missing { project_id: String, path: String },

    /// The blob exists but is not a service account key.
    #[error("credential for project '{project_id}' is not valid JSON: {source}")]
    Unparseable {
        project_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key parsed but a required field is empty or wrong.
    #[error("credential field '{field}' is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("object storage error: {0}")]
    Storage(#[from] object_store::Error),
}
