//! The version-indexed patch catalog.
//!
//! ```json
//! {
//!   "jquery-ui": {
//!     "1.10.0": {
//!       "ui/jquery-ui.js": [{"type": "jquery-plugin"}],
//!       "_add": {"0": "themes/base/jquery-ui.css"}
//!     }
//!   }
//! }
//! ```
//!
//! File order inside a version entry is significant (it decides where
//! patched files land in a package's file list), so [`PatchSet`] keeps the
//! document order instead of going through a hash map.

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;

use crate::transform::Transform;
use crate::types::{PackageName, Version};
use crate::version::select_best_version;

/// Key under which a version entry lists extra files to add to a package.
pub const ADD_KEY: &str = "_add";

/// Errors produced while reading a catalog document.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// The document is not a valid catalog.
    #[error("Invalid patch catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Package name → catalog version → patches. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PatchCatalog(HashMap<PackageName, HashMap<String, PatchSet>>);

impl PatchCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] if the text is not JSON, does not have
    /// the catalog shape, or a known transform carries malformed parameters.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Register the patches for one package version.
    pub fn insert(&mut self, name: PackageName, version: &str, patches: PatchSet) {
        self.0
            .entry(name)
            .or_default()
            .insert(version.to_string(), patches);
    }

    /// Catalog versions recorded for a package.
    pub fn versions(&self, name: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(name)
            .into_iter()
            .flat_map(|versions| versions.keys().map(String::as_str))
    }

    /// The catalog version that applies to `version` of `name`.
    pub fn select_version(&self, name: &str, version: &str) -> Version {
        select_best_version(version, self.versions(name))
    }

    /// Patches applicable to `version` of `name`, if any.
    pub fn patches_for(&self, name: &str, version: &str) -> Option<&PatchSet> {
        let selected = self.select_version(name, version);
        self.0.get(name)?.get(selected.as_str())
    }

    /// Number of packages with catalog entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a catalog entry says about one file key.
#[derive(Debug, Clone, PartialEq)]
pub enum FilePatch {
    /// Rewrite the file with these transforms, in order.
    Transforms(Vec<Transform>),
    /// Extra files to append to the package (the `_add` key).
    Add(Vec<String>),
}

/// The ordered file entries of one catalog version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchSet {
    entries: Vec<(String, FilePatch)>,
}

impl PatchSet {
    /// Create an empty patch set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `key`.
    pub fn insert(&mut self, key: impl Into<String>, patch: FilePatch) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = patch;
        } else {
            self.entries.push((key, patch));
        }
    }

    /// Builder-style [`PatchSet::insert`] for transform lists.
    pub fn with_transforms(mut self, file: &str, transforms: Vec<Transform>) -> Self {
        self.insert(file, FilePatch::Transforms(transforms));
        self
    }

    /// Entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilePatch)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The transform list for `file`, if the file is patched.
    pub fn transforms_for(&self, file: &str) -> Option<&[Transform]> {
        self.entries.iter().find_map(|(k, v)| match v {
            FilePatch::Transforms(t) if k == file => Some(t.as_slice()),
            _ => None,
        })
    }

    /// Whether `file` is rewritten by this patch set.
    pub fn is_patched(&self, file: &str) -> bool {
        self.transforms_for(file).is_some()
    }

    /// Number of file entries, `_add` included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for PatchSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PatchSetVisitor;

        impl<'de> Visitor<'de> for PatchSetVisitor {
            type Value = PatchSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of file paths to transform lists")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut set = PatchSet::new();
                while let Some(key) = map.next_key::<String>()? {
                    let patch = if key == ADD_KEY {
                        FilePatch::Add(map.next_value::<AddedFiles>()?.0)
                    } else {
                        FilePatch::Transforms(map.next_value::<Vec<Transform>>()?)
                    };
                    set.insert(key, patch);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(PatchSetVisitor)
    }
}

/// Value of an `_add` key: filenames either as a list or as the values of a
/// map (whose keys are ignored), in document order.
struct AddedFiles(Vec<String>);

impl<'de> Deserialize<'de> for AddedFiles {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AddedVisitor;

        impl<'de> Visitor<'de> for AddedVisitor {
            type Value = AddedFiles;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list or map of filenames")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut files = Vec::new();
                while let Some(file) = seq.next_element::<String>()? {
                    files.push(file);
                }
                Ok(AddedFiles(files))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut files = Vec::new();
                while let Some((_, file)) = map.next_entry::<serde::de::IgnoredAny, String>()? {
                    files.push(file);
                }
                Ok(AddedFiles(files))
            }
        }

        deserializer.deserialize_any(AddedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "widget": {
            "1.0.0": {
                "index.js": [{"type": "append", "parameters": "// patched"}],
                "_add": {"0": "extra.js", "1": "extra.css"},
                "lib/b.js": [{"type": "jquery-plugin"}]
            },
            "2.0.0": {
                "index.js": []
            }
        }
    }"#;

    #[test]
    fn test_document_order_is_kept() {
        let catalog = PatchCatalog::from_json(CATALOG).unwrap();
        let set = catalog.patches_for("widget", "1.4.2").unwrap();
        let keys: Vec<&str> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["index.js", "_add", "lib/b.js"]);
    }

    #[test]
    fn test_add_entries() {
        let catalog = PatchCatalog::from_json(CATALOG).unwrap();
        let set = catalog.patches_for("widget", "1.0.0").unwrap();
        let added = set.iter().find_map(|(_, v)| match v {
            FilePatch::Add(files) => Some(files.clone()),
            FilePatch::Transforms(_) => None,
        });
        assert_eq!(added, Some(vec!["extra.js".into(), "extra.css".into()]));
        assert!(!set.is_patched(ADD_KEY));
    }

    #[test]
    fn test_add_accepts_list() {
        let catalog =
            PatchCatalog::from_json(r#"{"a": {"1.0.0": {"_add": ["x.js", "y.js"]}}}"#).unwrap();
        let set = catalog.patches_for("a", "1.0.0").unwrap();
        assert_eq!(
            set.iter().next().map(|(_, v)| v.clone()),
            Some(FilePatch::Add(vec!["x.js".into(), "y.js".into()]))
        );
    }

    #[test]
    fn test_version_selection_through_catalog() {
        let catalog = PatchCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.select_version("widget", "2.5.0"), "2.0.0");
        assert!(catalog.patches_for("widget", "0.9.0").is_none());
        assert!(catalog.patches_for("unknown", "1.0.0").is_none());
    }

    #[test]
    fn test_transforms_for() {
        let catalog = PatchCatalog::from_json(CATALOG).unwrap();
        let set = catalog.patches_for("widget", "1.0.0").unwrap();
        assert_eq!(
            set.transforms_for("index.js"),
            Some(&[Transform::Append("// patched".into())][..])
        );
        assert!(set.transforms_for("missing.js").is_none());
    }

    #[test]
    fn test_invalid_catalog() {
        assert!(PatchCatalog::from_json("[1, 2]").is_err());
        assert!(PatchCatalog::from_json(r#"{"a": {"1.0.0": {"x.js": "nope"}}}"#).is_err());
    }
}
