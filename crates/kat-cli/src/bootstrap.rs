use anyhow::Context;
use kat_config::KatalogConfig;

/// Load `.env`, then the layered configuration.
pub fn load_config() -> anyhow::Result<KatalogConfig> {
    KatalogConfig::load_with_dotenv().context("failed to load katalog configuration")
}
