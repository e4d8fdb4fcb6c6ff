//! Sync pipeline tuning.

use serde::{Deserialize, Serialize};

const fn default_max_concurrent_fetches() -> usize {
    8
}

const fn default_channel_capacity() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Datasets fetched from the warehouse at the same time.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Capacity of the queue between fetch tasks and the writer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
