use std::sync::Arc;

use anyhow::Context;
use kat_search::meilisearch::MeilisearchClient;
use kat_secrets::CredentialStore;
use kat_sync::source::connect_bigquery;
use kat_sync::{SyncSettings, Syncer};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SyncArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `katalog sync`.
///
/// The project is registered only once its credential has been loaded.
pub async fn handle(
    args: &SyncArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let storage = ctx.config.require_storage()?;
    let store =
        CredentialStore::from_config(storage).context("failed to build credential store")?;
    let provider = connect_bigquery(
        &store,
        &ctx.config.warehouse,
        &args.project,
        args.gcp_project.clone(),
    )
    .await?;

    let name = args.name.as_deref().unwrap_or(&args.project);
    ctx.db
        .ensure_project(&args.project, name)
        .await
        .with_context(|| format!("failed to register project {}", args.project))?;

    let mut syncer = Syncer::new(
        Arc::clone(&ctx.db),
        Arc::new(provider),
        SyncSettings::from_config(&ctx.config),
    );
    if ctx.config.search.is_configured() {
        match MeilisearchClient::from_config(&ctx.config.search) {
            Ok(index) => syncer = syncer.with_index(Arc::new(index)),
            Err(error) => {
                tracing::warn!(%error, "search index unavailable; continuing without it");
            }
        }
    }

    let outcome = syncer.try_run(&args.project).await?;
    tracing::info!(
        project_id = %outcome.project_id,
        changes = outcome.changelog_entries(),
        elapsed_ms = outcome.elapsed_ms,
        "sync finished"
    );
    output(&outcome, flags.format)
}
