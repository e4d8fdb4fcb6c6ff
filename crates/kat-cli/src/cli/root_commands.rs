use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Reconcile a project's catalog with its warehouse.
    Sync(SyncArgs),
    /// Recent sync runs of a project.
    History(HistoryArgs),
    /// Changelog entries recorded by one sync run.
    Changelog(ChangelogArgs),
    /// Current stored catalog of a project.
    Snapshot(SnapshotArgs),
    /// Search a project's datasets, tables and columns.
    Search(SearchArgs),
    /// Create the search index and apply its settings.
    InitIndex,
}

#[derive(Clone, Debug, Args)]
pub struct SyncArgs {
    /// Project id
    #[arg(long)]
    pub project: String,
    /// Display name used when the project is first registered
    #[arg(long)]
    pub name: Option<String>,
    /// GCP project to read (defaults to the service account's project)
    #[arg(long)]
    pub gcp_project: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct HistoryArgs {
    #[arg(long)]
    pub project: String,
    /// Also report changelog totals
    #[arg(long)]
    pub summary: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ChangelogArgs {
    /// Sync run id
    #[arg(long)]
    pub sync: String,
}

#[derive(Clone, Debug, Args)]
pub struct SnapshotArgs {
    #[arg(long)]
    pub project: String,
}

#[derive(Clone, Debug, Args)]
pub struct SearchArgs {
    #[arg(long)]
    pub project: String,
    /// Free text, optionally prefixed with `ds:`, `tab:` or `col:`
    pub query: String,
}
