use kat_core::snapshot::CatalogSnapshot;
use serde::Serialize;

use crate::cli::root_commands::SnapshotArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::context::AppContext;
use crate::output::output;

/// One row per column, or per table when a table has no columns.
#[derive(Debug, Serialize)]
struct CatalogRow<'a> {
    dataset: &'a str,
    table: &'a str,
    rows: Option<i64>,
    column: &'a str,
    #[serde(rename = "type")]
    column_type: &'a str,
}

fn rows(snapshot: &CatalogSnapshot) -> Vec<CatalogRow<'_>> {
    let mut out = Vec::new();
    for dataset in &snapshot.datasets {
        let ds = dataset.dataset.name.as_str();
        if dataset.tables.is_empty() {
            out.push(CatalogRow {
                dataset: ds,
                table: "-",
                rows: None,
                column: "-",
                column_type: "-",
            });
        }
        for table in &dataset.tables {
            let tbl = table.table.name.as_str();
            let row_count = Some(table.table.row_count);
            if table.columns.is_empty() {
                out.push(CatalogRow {
                    dataset: ds,
                    table: tbl,
                    rows: row_count,
                    column: "-",
                    column_type: "-",
                });
            }
            for column in &table.columns {
                out.push(CatalogRow {
                    dataset: ds,
                    table: tbl,
                    rows: row_count,
                    column: &column.name,
                    column_type: &column.column_type,
                });
            }
        }
    }
    out
}

/// Handle `katalog snapshot`.
pub async fn handle(
    args: &SnapshotArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let snapshot = ctx.db.load_snapshot(&args.project).await?;
    tracing::debug!(project_id = %args.project, counts = ?snapshot.counts(), "loaded snapshot");
    match flags.format {
        OutputFormat::Table => output(&rows(&snapshot), flags.format),
        OutputFormat::Json | OutputFormat::Raw => output(&snapshot, flags.format),
    }
}
