//! List command

use anyhow::Result;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;

use esx_core::types::PackageMap;

use crate::context::Context;

/// Show every resolved package with its files and patched files.
pub async fn list(ctx: &Context) -> Result<()> {
    let session = ctx.resolved().await?;
    let packages = &session.state().packages;

    if packages.is_empty() {
        println!();
        println!("  No packages installed.");
        println!("  Add dependencies to bower.json and run 'esx patch'.");
        return Ok(());
    }

    println!("{}", package_table(packages));
    Ok(())
}

fn package_table(packages: &PackageMap) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(vec!["Package", "Version", "Files", "Patched"]);

    for (name, record) in packages.iter() {
        let patched: Vec<&str> = record.patched_files().map(|(file, _)| file).collect();
        table.add_row(vec![
            name.to_string(),
            record.version.to_string(),
            record.files.len().to_string(),
            patched.join(", "),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use esx_core::types::{PackageName, PackageRecord, PatchSet, Transform, Version};

    #[test]
    fn test_package_table_rows() {
        let mut packages = PackageMap::new();
        packages.insert(
            PackageName::new("chosen"),
            PackageRecord {
                version: Version::new("1.4.2"),
                files: vec!["chosen.css".into(), "chosen.jquery.js".into()],
                patches: Some(
                    PatchSet::new().with_transforms("chosen.jquery.js", vec![Transform::PluginWrap]),
                ),
            },
        );

        let rendered = package_table(&packages).to_string();
        assert!(rendered.contains("chosen"));
        assert!(rendered.contains("1.4.2"));
        assert!(rendered.contains("chosen.jquery.js"));
    }
}
