//! Flattening of the resolved dependency tree into a [`PackageMap`].
//!
//! The resolver hands back a tree; the build pipeline wants one record per
//! package name. Each record's file list is the package's declared entry
//! files plus whatever the catalog adds or patches for that version.

use tracing::debug;

use crate::paths;
use crate::types::{
    Dependencies, FilePatch, PackageMap, PackageName, PackageRecord, PatchCatalog, PatchSet,
    Version,
};

/// Walk `descriptions` recursively and record every installed package.
///
/// Missing packages are skipped. A package seen more than once keeps the
/// record of the last visit (deeper nodes are visited after their parents).
pub fn flatten(
    descriptions: &Dependencies,
    catalog: &PatchCatalog,
    directory: &str,
    packages: &mut PackageMap,
) {
    for (name, desc) in descriptions {
        if desc.missing {
            debug!(package = %name, "skipping missing dependency");
            continue;
        }

        let version = desc
            .meta
            .version
            .as_deref()
            .map_or_else(Version::none, Version::new);
        let declared = desc
            .meta
            .main
            .as_ref()
            .map(esx_schema::MainFiles::to_vec)
            .unwrap_or_default();

        let mut files = sanitize_files(name, &declared, directory);
        let patches = catalog.patches_for(name, &version);
        if let Some(set) = patches {
            merge_patch_files(&mut files, set);
        }

        debug!(
            package = %name,
            version = %version,
            files = files.len(),
            patched = patches.is_some(),
            "flattened package"
        );

        packages.insert(
            name.clone(),
            PackageRecord {
                version,
                files,
                patches: patches.cloned(),
            },
        );

        flatten(&desc.dependencies, catalog, directory, packages);
    }
}

/// Strip a leading `./`, drop the package's own directory, drop duplicates.
fn sanitize_files(name: &PackageName, declared: &[String], directory: &str) -> Vec<String> {
    let own_dir = paths::join(directory, name);
    let mut files: Vec<String> = Vec::with_capacity(declared.len());

    for file in declared {
        let file = file.strip_prefix("./").unwrap_or(file);
        if file == own_dir || files.iter().any(|f| f == file) {
            continue;
        }
        files.push(file.to_string());
    }
    files
}

/// `_add` files are appended as-is; patched files only when not listed yet.
fn merge_patch_files(files: &mut Vec<String>, patches: &PatchSet) {
    for (key, patch) in patches.iter() {
        match patch {
            FilePatch::Add(added) => files.extend(added.iter().cloned()),
            FilePatch::Transforms(_) => {
                if !files.iter().any(|f| f == key) {
                    files.push(key.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DependencyDescription, Transform};

    const DIR: &str = "bower_components";

    fn catalog() -> PatchCatalog {
        PatchCatalog::from_json(
            r#"{
                "a": {"1.0.0": {
                    "_add": {"0": "extra.js"},
                    "a.js": [{"type": "append", "parameters": "x"}],
                    "b.js": [{"type": "append", "parameters": "y"}]
                }}
            }"#,
        )
        .unwrap()
    }

    fn tree() -> Dependencies {
        let mut deps = Dependencies::new();
        deps.insert(
            "a".into(),
            DependencyDescription::installed("1.0.0", &["./a.js", "lib/a.js"])
                .with_dependency("c", DependencyDescription::installed("2.0.0", &["c.js"]))
                .with_dependency("gone", DependencyDescription::missing()),
        );
        deps
    }

    #[test]
    fn test_file_list_is_sanitized() {
        let mut deps = Dependencies::new();
        deps.insert(
            "a".into(),
            DependencyDescription::installed(
                "0.1.0",
                &["./a.js", "lib/a.js", "a.js", "bower_components/a"],
            ),
        );
        let mut map = PackageMap::new();
        flatten(&deps, &PatchCatalog::new(), DIR, &mut map);

        assert_eq!(map.get("a").unwrap().files, vec!["a.js", "lib/a.js"]);
    }

    #[test]
    fn test_patch_files_are_merged() {
        let mut map = PackageMap::new();
        flatten(&tree(), &catalog(), DIR, &mut map);

        let a = map.get("a").unwrap();
        assert_eq!(a.files, vec!["a.js", "lib/a.js", "extra.js", "b.js"]);
        assert!(a.is_patched("a.js"));
        assert!(a.is_patched("b.js"));
        assert!(!a.is_patched("extra.js"));
    }

    #[test]
    fn test_add_appends_even_when_listed() {
        let catalog = PatchCatalog::from_json(r#"{"a": {"1.0.0": {"_add": ["a.js"]}}}"#).unwrap();
        let mut map = PackageMap::new();
        flatten(&tree(), &catalog, DIR, &mut map);
        assert_eq!(map.get("a").unwrap().files, vec!["a.js", "lib/a.js", "a.js"]);
    }

    #[test]
    fn test_recurses_and_skips_missing() {
        let mut map = PackageMap::new();
        flatten(&tree(), &catalog(), DIR, &mut map);

        let names: Vec<&str> = map.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(map.get("c").unwrap().version, "2.0.0");
        assert!(map.get("c").unwrap().patches.is_none());
    }

    #[test]
    fn test_missing_version_defaults() {
        let mut deps = Dependencies::new();
        deps.insert("v".into(), DependencyDescription::default());
        let mut map = PackageMap::new();
        flatten(&deps, &PatchCatalog::new(), DIR, &mut map);
        let v = map.get("v").unwrap();
        assert_eq!(v.version, "0.0.0");
        assert!(v.files.is_empty());
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let mut first = PackageMap::new();
        let mut second = PackageMap::new();
        flatten(&tree(), &catalog(), DIR, &mut first);
        flatten(&tree(), &catalog(), DIR, &mut second);
        assert_eq!(first, second);

        flatten(&tree(), &catalog(), DIR, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_visit_wins() {
        let mut deps = Dependencies::new();
        deps.insert(
            "app".into(),
            DependencyDescription::installed("1.0.0", &["app.js"])
                .with_dependency("shared", DependencyDescription::installed("2.0.0", &["s.js"])),
        );
        deps.insert(
            "shared".into(),
            DependencyDescription::installed("1.0.0", &["s.js"]),
        );
        let mut map = PackageMap::new();
        flatten(&deps, &PatchCatalog::new(), DIR, &mut map);

        // "app" and its nested "shared@2" are visited before the top-level "shared@1".
        assert_eq!(map.get("shared").unwrap().version, "1.0.0");
    }

    #[test]
    fn test_transforms_survive_flattening() {
        let mut map = PackageMap::new();
        flatten(&tree(), &catalog(), DIR, &mut map);
        let a = map.get("a").unwrap();
        let (file, transforms) = a.patched_files().next().unwrap();
        assert_eq!(file, "a.js");
        assert_eq!(transforms, &[Transform::Append("x".into())]);
    }
}
