use anyhow::Context;
use kat_search::SearchIndex;
use kat_search::meilisearch::MeilisearchClient;
use kat_search::query::{ResourceQuery, SearchRequest};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SearchArgs;
use crate::context::AppContext;
use crate::output::output;

const DEFAULT_LIMIT: u32 = 20;

/// Handle `katalog search`.
pub async fn handle(
    args: &SearchArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let client = MeilisearchClient::from_config(&ctx.config.search)
        .context("search index is not configured")?;
    let query = ResourceQuery::parse(args.project.as_str(), &args.query);
    let limit = flags.limit.unwrap_or(DEFAULT_LIMIT) as usize;
    let hits = client.search(&SearchRequest::new(query, limit)).await?;
    output(&hits, flags.format)
}
