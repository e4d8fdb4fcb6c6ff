//! Meilisearch configuration.

use serde::{Deserialize, Serialize};

fn default_url() -> String {
    String::from("http://localhost:7700")
}

fn default_index() -> String {
    String::from("resources")
}

const fn default_batch_size() -> usize {
    1000
}

const fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// Master or API key. Empty sends no `Authorization` header.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_index")]
    pub index: String,

    /// Documents per add/delete request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// When false, syncs skip index propagation entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: String::new(),
            index: default_index(),
            batch_size: default_batch_size(),
            enabled: default_enabled(),
        }
    }
}

impl SearchConfig {
    /// Enabled and pointing somewhere.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.url.is_empty() && !self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_meilisearch() {
        let config = SearchConfig::default();
        assert_eq!(config.url, "http://localhost:7700");
        assert_eq!(config.index, "resources");
        assert_eq!(config.batch_size, 1000);
        assert!(config.is_configured());
    }

    #[test]
    fn disabled_is_not_configured() {
        let config = SearchConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!config.is_configured());
    }
}
