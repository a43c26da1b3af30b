//! Js command

use anyhow::Result;

use crate::context::Context;

/// Print the JavaScript files of one package.
pub async fn js(ctx: &Context, package: &str, names: &[String]) -> Result<()> {
    let session = ctx.resolved().await?;
    for file in session.projection().js_for_package(package, names)? {
        println!("{file}");
    }
    Ok(())
}
