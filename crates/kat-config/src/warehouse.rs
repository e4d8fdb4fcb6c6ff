//! Remote warehouse (BigQuery) client configuration.

use serde::{Deserialize, Serialize};

fn default_api_base_url() -> String {
    String::from("https://bigquery.googleapis.com/bigquery/v2")
}

const fn default_page_size() -> u32 {
    1000
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_attempts() -> u32 {
    4
}

const fn default_base_delay_ms() -> u64 {
    100
}

const fn default_max_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WarehouseConfig {
    /// BigQuery REST root, without a trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Overrides the `token_uri` from the service account key. Empty keeps
    /// the key's value.
    #[serde(default)]
    pub token_uri_override: String,

    /// `maxResults` for list calls.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per call for transient failures, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token_uri_override: String::new(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl WarehouseConfig {
    /// The token endpoint override, if one is set.
    #[must_use]
    pub fn token_uri_override(&self) -> Option<&str> {
        (!self.token_uri_override.is_empty()).then_some(self.token_uri_override.as_str())
    }
}
