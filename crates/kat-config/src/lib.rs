//! # kat-config
//!
//! Layered configuration loading for Katalog using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`KATALOG_*` prefix, `__` as separator)
//! 2. Project-level `.katalog/config.toml`
//! 3. User-level `~/.config/katalog/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `KATALOG_SEARCH__URL` -> `search.url`,
//! `KATALOG_STORAGE__BUCKET` -> `storage.bucket`, etc. The `__` (double
//! underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use kat_config::KatalogConfig;
//!
//! let config = KatalogConfig::load_with_dotenv().expect("config");
//! if config.search.is_configured() {
//!     println!("Meilisearch at {}", config.search.url);
//! }
//! ```

mod database;
mod error;
mod search;
mod storage;
mod sync;
mod warehouse;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use search::SearchConfig;
pub use storage::{StorageBackend, StorageConfig};
pub use sync::SyncConfig;
pub use warehouse::WarehouseConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KatalogConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl KatalogConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source fails to parse or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer extra providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".katalog/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("KATALOG_").split("__"))
    }

    /// Reject values that would stall or break a sync.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.is_empty() {
            return Err(ConfigError::invalid("database.path", "must not be empty"));
        }
        if self.warehouse.page_size == 0 {
            return Err(ConfigError::invalid("warehouse.page_size", "must be at least 1"));
        }
        if self.warehouse.max_attempts == 0 {
            return Err(ConfigError::invalid("warehouse.max_attempts", "must be at least 1"));
        }
        if self.warehouse.base_delay_ms > self.warehouse.max_delay_ms {
            return Err(ConfigError::invalid(
                "warehouse.base_delay_ms",
                "must not exceed warehouse.max_delay_ms",
            ));
        }
        if self.search.batch_size == 0 {
            return Err(ConfigError::invalid("search.batch_size", "must be at least 1"));
        }
        if self.sync.max_concurrent_fetches == 0 {
            return Err(ConfigError::invalid("sync.max_concurrent_fetches", "must be at least 1"));
        }
        if self.sync.channel_capacity == 0 {
            return Err(ConfigError::invalid("sync.channel_capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// Fail with `NotConfigured` unless credential storage is usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotConfigured` for the `storage` section.
    pub fn require_storage(&self) -> Result<&StorageConfig, ConfigError> {
        if self.storage.is_configured() {
            Ok(&self.storage)
        } else {
            Err(ConfigError::NotConfigured {
                section: "storage".into(),
            })
        }
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("katalog").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) looking for a `.env`
    /// file, then falls back to the current directory. Silently does nothing
    /// if none is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
