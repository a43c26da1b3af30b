//! Clean command

use anyhow::{Context as _, Result};

use esx_core::manifest::ResolverConfig;
use esx_core::patch::find_artifacts;

use crate::context::Context;

/// Delete every patched artifact under the install directory.
pub async fn clean(ctx: &Context, dry_run: bool) -> Result<()> {
    let root = &ctx.settings.session.root;
    let config = ResolverConfig::load(root).await;
    let install_dir = root.join(config.directory());

    let artifacts = find_artifacts(&install_dir, &ctx.settings.session.marker);
    if artifacts.is_empty() {
        ctx.output.success("Nothing to clean.");
        return Ok(());
    }

    for artifact in &artifacts {
        ctx.output.info(&ctx.output.display(artifact).to_string());
        if !dry_run {
            tokio::fs::remove_file(artifact)
                .await
                .with_context(|| format!("Failed to remove {}", artifact.display()))?;
        }
    }

    let verb = if dry_run { "Would remove" } else { "Removed" };
    ctx.output
        .success(&format!("{verb} {} patched file(s).", artifacts.len()));
    Ok(())
}
