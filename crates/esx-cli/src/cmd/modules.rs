//! Modules command

use anyhow::Result;

use crate::context::Context;

/// Print module loader configs as pretty JSON.
pub async fn modules(ctx: &Context) -> Result<()> {
    let session = ctx.resolved().await?;
    let configs = session.projection().module_configs();
    println!("{}", serde_json::to_string_pretty(&configs)?);
    Ok(())
}
