use kat_core::entities::SyncRun;
use kat_db::repos::changelog::ChangelogSummary;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::HistoryArgs;
use crate::context::AppContext;
use crate::output::output;

const DEFAULT_LIMIT: u32 = 5;

#[derive(Debug, Serialize)]
struct HistoryResponse {
    runs: Vec<SyncRun>,
    summary: ChangelogSummary,
}

/// Handle `katalog history`.
pub async fn handle(
    args: &HistoryArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let limit = flags.limit.unwrap_or(DEFAULT_LIMIT);
    let runs = ctx.db.list_sync_runs(&args.project, limit).await?;
    if !args.summary {
        return output(&runs, flags.format);
    }

    let summary = ctx.db.changelog_summary(&args.project, None).await?;
    output(&HistoryResponse { runs, summary }, flags.format)
}
