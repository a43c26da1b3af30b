//! Files command

use anyhow::Result;

use crate::context::Context;

/// Print every resolved file, patched names included.
pub async fn files(ctx: &Context) -> Result<()> {
    let session = ctx.resolved().await?;
    for file in session.projection().filenames() {
        println!("{file}");
    }
    Ok(())
}
