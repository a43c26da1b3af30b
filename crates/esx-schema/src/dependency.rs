//! Dependency descriptions produced by the package-resolution collaborator.
//!
//! The shape follows `bower list --json`: every node carries the installed
//! package's metadata under `pkgMeta` and its own resolved dependencies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::PackageName;

/// Resolved dependencies keyed by package name.
pub type Dependencies = BTreeMap<PackageName, DependencyDescription>;

/// One node of the resolved dependency tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyDescription {
    /// Metadata of the installed package.
    #[serde(default, rename = "pkgMeta")]
    pub meta: PackageMeta,
    /// Declared but not installed (unresolved optional or peer dependency).
    #[serde(default)]
    pub missing: bool,
    /// Dependencies of this package.
    #[serde(default)]
    pub dependencies: Dependencies,
}

impl DependencyDescription {
    /// A resolved node with the given version and main files.
    pub fn installed(version: &str, main: &[&str]) -> Self {
        Self {
            meta: PackageMeta {
                version: Some(version.to_string()),
                main: Some(MainFiles::Many(main.iter().map(ToString::to_string).collect())),
                ..PackageMeta::default()
            },
            ..Self::default()
        }
    }

    /// A node for a declared dependency that is not installed.
    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    /// Builder-style insertion of a child dependency.
    pub fn with_dependency(mut self, name: &str, child: DependencyDescription) -> Self {
        self.dependencies.insert(PackageName::new(name), child);
        self
    }
}

/// Package metadata as found in `bower.json` / `.bower.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageMeta {
    /// Package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Installed version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Entry files of the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<MainFiles>,
    /// Declared dependencies, name to version range.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
}

/// `main` may be a single path or a list of paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MainFiles {
    /// A single entry file.
    One(String),
    /// Several entry files.
    Many(Vec<String>),
}

impl MainFiles {
    /// The entry files as a slice-like list.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(file) => vec![file.clone()],
            Self::Many(files) => files.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bower_list_node() {
        let json = r#"{
            "pkgMeta": {"name": "a", "version": "1.2.0", "main": "./a.js"},
            "dependencies": {
                "b": {"pkgMeta": {"version": "0.1.0", "main": ["b.js", "b.css"]}},
                "c": {"missing": true}
            }
        }"#;
        let node: DependencyDescription = serde_json::from_str(json).unwrap();
        assert_eq!(node.meta.version.as_deref(), Some("1.2.0"));
        assert_eq!(node.meta.main.as_ref().map(MainFiles::to_vec), Some(vec!["./a.js".into()]));
        assert_eq!(node.dependencies.len(), 2);
        assert!(node.dependencies["c"].missing);
        assert_eq!(
            node.dependencies["b"].meta.main,
            Some(MainFiles::Many(vec!["b.js".into(), "b.css".into()]))
        );
    }
}
