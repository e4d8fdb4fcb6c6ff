use std::sync::Arc;

use anyhow::Context;
use kat_config::KatalogConfig;
use kat_db::KatDb;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub config: KatalogConfig,
    pub db: Arc<KatDb>,
}

impl AppContext {
    pub async fn init(config: KatalogConfig) -> anyhow::Result<Self> {
        let db = KatDb::open_local(&config.database.path)
            .await
            .with_context(|| {
                format!(
                    "failed to open catalog database at {}",
                    config.database.path
                )
            })?;
        if !config.search.is_configured() {
            tracing::debug!("search index disabled; syncs will skip indexing");
        }
        Ok(Self {
            config,
            db: Arc::new(db),
        })
    }
}
