use anyhow::Context;
use kat_search::meilisearch::MeilisearchClient;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct InitIndexResponse<'a> {
    index: &'a str,
    ready: bool,
}

/// Handle `katalog init-index`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let client = MeilisearchClient::from_config(&ctx.config.search)
        .context("search index is not configured")?;
    client.ensure_index().await?;
    output(
        &InitIndexResponse {
            index: client.index(),
            ready: true,
        },
        flags.format,
    )
}
