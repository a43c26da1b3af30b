//! Patch command

use anyhow::Result;

use crate::context::Context;

/// Install missing packages, then rebuild stale artifacts.
pub async fn patch(ctx: &Context) -> Result<()> {
    let mut session = ctx.session();
    let report = session.run().await?;

    if report.total() == 0 {
        ctx.output.info("No patched files in the installed packages.");
        return Ok(());
    }
    ctx.output.success(&format!(
        "{} rebuilt, {} up to date",
        report.rebuilt.len(),
        report.up_to_date.len()
    ));
    Ok(())
}
