use anyhow::bail;
use kat_core::entities::ChangelogEntry;
use serde::Serialize;

use crate::cli::root_commands::ChangelogArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::context::AppContext;
use crate::output::output;

/// Compact row for table output.
#[derive(Debug, Serialize)]
struct ChangeRow<'a> {
    change: String,
    entity: String,
    name: &'a str,
    field: &'a str,
    old: &'a str,
    new: &'a str,
    parent: &'a str,
}

fn rows(entries: &[ChangelogEntry]) -> Vec<ChangeRow<'_>> {
    entries
        .iter()
        .map(|e| ChangeRow {
            change: e.change_type.to_string(),
            entity: e.entity_type.to_string(),
            name: &e.entity_name,
            field: &e.field_name,
            old: &e.old_value,
            new: &e.new_value,
            parent: e.parent_name.as_deref().unwrap_or("-"),
        })
        .collect()
}

/// Handle `katalog changelog`.
pub async fn handle(
    args: &ChangelogArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    if ctx.db.get_sync_run(&args.sync).await?.is_none() {
        bail!("sync run {} not found", args.sync);
    }
    let entries = ctx.db.changelog_for_sync(&args.sync).await?;
    match flags.format {
        OutputFormat::Table => output(&rows(&entries), flags.format),
        OutputFormat::Json | OutputFormat::Raw => output(&entries, flags.format),
    }
}
